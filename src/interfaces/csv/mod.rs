pub mod campaign_writer;
pub mod command_reader;
