pub mod rating;
pub mod recycle_bin;
pub mod set_list;
pub mod shared;
pub mod track;
pub mod work;
