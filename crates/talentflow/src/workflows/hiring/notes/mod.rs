mod service;

pub use service::{NewNote, NoteEdit, NoteGateway, NoteThread, MAX_MESSAGE_CHARS};
