//! Streams which know how many records they will yield.
//!
//! Async line and CSV readers can't know how many records remain, but we can
//! count them up front when reading a regular file. Attaching that count to
//! the stream lets the progress bar show a real length.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;

/// A [`Stream`] wrapper reporting an externally supplied size hint, which
/// shrinks by one for every item yielded.
pub struct SizeHintStream<S> {
    inner: S,
    remaining: (usize, Option<usize>),
}

impl<S> Stream for SizeHintStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(Some(_)) = &polled {
            let (lower, upper) = this.remaining;
            this.remaining = (
                lower.saturating_sub(1),
                upper.map(|upper| upper.saturating_sub(1)),
            );
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.remaining
    }
}

/// Extension method adding `with_size_hint` to every [`Stream`].
pub trait WithSizeHintExt: Stream + Sized {
    /// Report `size_hint` from now on, instead of the stream's own.
    fn with_size_hint(self, size_hint: (usize, Option<usize>)) -> SizeHintStream<Self> {
        SizeHintStream {
            inner: self,
            remaining: size_hint,
        }
    }
}

impl<S> WithSizeHintExt for S where S: Stream {}
