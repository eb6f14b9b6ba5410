pub mod output_writer;
pub mod webhook_reader;
