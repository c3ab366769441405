pub mod item;
pub mod user;

pub use item::{
    Collection, Item, ItemAction, ItemMap, ItemRecord, ItemStatus, MAX_NAME_LEN, NewItemRequest,
    NoteRequest, RenameItemRequest,
};
pub use user::{
    EmailRequest, LoginRequest, PasswordChangeRequest, Profile, SignupRequest, UserRecord,
    UsernameRequest, decode_users, users_path,
};
