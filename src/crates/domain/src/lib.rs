pub mod comment;
pub mod rating;
pub mod recycle_bin;
pub mod set_list;
pub mod track;
pub mod value;
pub mod version_type;
pub mod work;
