pub mod comment;
pub mod rating;
pub mod recycle_bin;
pub mod set_list;
pub mod shared;
pub mod version_type;
pub mod work;
