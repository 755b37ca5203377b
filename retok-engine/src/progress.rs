//! Progress reporting hooks

/// Receives progress notifications while a repair call runs.
///
/// Purely observational; nothing it does affects the results.
pub trait ProgressObserver {
    /// A repair call is about to send `total_chars` characters to the model
    fn start(&self, total_chars: usize);

    /// A batch containing `chars` characters came back from the model
    fn batch_finished(&self, chars: usize);

    /// All batches are done
    fn finish(&self) {}
}

impl<P: ProgressObserver + ?Sized> ProgressObserver for Box<P> {
    fn start(&self, total_chars: usize) {
        (**self).start(total_chars)
    }

    fn batch_finished(&self, chars: usize) {
        (**self).batch_finished(chars)
    }

    fn finish(&self) {
        (**self).finish()
    }
}
