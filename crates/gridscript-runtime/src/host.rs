//! Host capability surface
//!
//! Output and messaging are delegated to the embedder; the engine never
//! owns an output device or a broadcast channel.

/// Output and broadcast primitives provided by the embedder
pub trait Host {
    /// Emit a line of program output.
    fn print(&mut self, text: &str);

    /// Broadcast a message on a tagged channel.
    fn send(&mut self, tag: &str, message: &str);

    /// Start listening on a tagged channel.
    fn listen(&mut self, tag: &str);
}

/// Discards everything; useful for headless programs and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {
    fn print(&mut self, _text: &str) {}
    fn send(&mut self, _tag: &str, _message: &str) {}
    fn listen(&mut self, _tag: &str) {}
}
