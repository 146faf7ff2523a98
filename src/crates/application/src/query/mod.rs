pub mod comment;
pub mod recycle_bin;
pub mod set_list;
pub mod track;
pub mod work;
