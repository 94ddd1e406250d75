pub mod deflate_reader_input;
pub mod deflate_slice_input;
pub mod deflate_window_output;
