//! Streaming response capture.
//!
//! `CapturingBody` passes every frame of the wrapped body through unchanged
//! while mirroring data frames into a buffer. When the wrapped body reports
//! end-of-stream, the completion handler receives the full body exactly once,
//! before end-of-stream is returned to the caller. Storage therefore happens
//! only after the caller has drained the body.

use bytes::{Bytes, BytesMut};
use hyper::body::{Body, Frame, SizeHint};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Single-shot completion handler receiving the captured body
pub type OnComplete = Box<dyn FnOnce(Bytes) + Send + 'static>;

/// Body wrapper that hands a copy of the full body to a handler at EOF
pub struct CapturingBody<B> {
    inner: B,
    buffer: BytesMut,
    on_complete: Option<OnComplete>,
}

impl<B> CapturingBody<B> {
    pub fn new<F>(inner: B, on_complete: F) -> Self
    where
        F: FnOnce(Bytes) + Send + 'static,
    {
        Self {
            inner,
            buffer: BytesMut::new(),
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Whether the completion handler has already run
    pub fn is_complete(&self) -> bool {
        self.on_complete.is_none()
    }
}

impl<B> fmt::Debug for CapturingBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturingBody")
            .field("captured_bytes", &self.buffer.len())
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl<B> Body for CapturingBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                if let Some(on_complete) = this.on_complete.take() {
                    on_complete(std::mem::take(&mut this.buffer).freeze());
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }

    // is_end_stream stays at the default (false): completion runs on None.
    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<Bytes>>>;

    fn recorder() -> (Captured, impl FnOnce(Bytes) + Send + 'static) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        (captured, move |bytes| sink.lock().unwrap().push(bytes))
    }

    #[tokio::test]
    async fn test_captures_full_body_once() {
        let inner = Chunked(
            vec![
                Bytes::from("hello "),
                Bytes::from("streaming "),
                Bytes::from("world"),
            ]
            .into(),
        );
        let (captured, on_complete) = recorder();

        let body = CapturingBody::new(inner, on_complete);
        let collected = body.collect().await.unwrap().to_bytes();

        assert_eq!(collected, Bytes::from("hello streaming world"));
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0], Bytes::from("hello streaming world"));
    }

    #[tokio::test]
    async fn test_handler_not_called_before_eof() {
        let (captured, on_complete) = recorder();
        let mut body = CapturingBody::new(Full::new(Bytes::from("abc")), on_complete);

        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from("abc"));
        assert!(captured.lock().unwrap().is_empty());
        assert!(!body.is_complete());

        assert!(body.frame().await.is_none());
        assert_eq!(captured.lock().unwrap().len(), 1);
        assert!(body.is_complete());
    }

    #[tokio::test]
    async fn test_repeated_eof_calls_handler_once() {
        let (captured, on_complete) = recorder();
        let mut body = CapturingBody::new(Full::new(Bytes::from("abc")), on_complete);

        while body.frame().await.is_some() {}
        assert!(body.frame().await.is_none());
        assert!(body.frame().await.is_none());

        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_body_completes_with_empty_bytes() {
        let (captured, on_complete) = recorder();
        let body = CapturingBody::new(Full::new(Bytes::new()), on_complete);
        body.collect().await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].is_empty());
    }

    /// Body yielding one data frame per chunk
    struct Chunked(std::collections::VecDeque<Bytes>);

    impl Body for Chunked {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            Poll::Ready(self.0.pop_front().map(|chunk| Ok(Frame::data(chunk))))
        }
    }
}
