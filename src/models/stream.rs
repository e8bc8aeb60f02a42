use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::GoogleGenerativeAIError;

/// A forward-only stream of answer fragments.
///
/// Each item is the text of one streamed response chunk and may be empty.
/// The stream can be consumed once; dropping it stops the download.
pub struct TextStream {
    inner: ReceiverStream<Result<String, GoogleGenerativeAIError>>,
}

impl TextStream {
    /// Creates a new TextStream fed by the given channel.
    pub fn new(receiver: mpsc::Receiver<Result<String, GoogleGenerativeAIError>>) -> Self {
        Self {
            inner: ReceiverStream::new(receiver),
        }
    }

    /// Creates a stream that yields the given fragments and then ends.
    pub fn from_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk, so this cannot fail.
            let _ = tx.try_send(Ok(chunk));
        }
        Self::new(rx)
    }
}

impl fmt::Debug for TextStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextStream").finish_non_exhaustive()
    }
}

impl Stream for TextStream {
    type Item = Result<String, GoogleGenerativeAIError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}
