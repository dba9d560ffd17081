pub mod autopick;
pub mod catalogue;
pub mod pick;
pub mod roster;
pub mod snake;
pub mod state;
