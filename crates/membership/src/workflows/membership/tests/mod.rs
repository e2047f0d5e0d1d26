mod common;
mod forms;
