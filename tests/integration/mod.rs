mod pipeline;
mod transport;
