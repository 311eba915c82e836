mod common;
mod notes;
mod visibility;
