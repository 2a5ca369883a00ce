mod push_channel_kafka;

pub use push_channel_kafka::*;
