mod get_local_list_version;
pub use get_local_list_version::*;

mod send_local_list;
pub use send_local_list::*;
