//! Streaming response bodies that own their workspace.
//!
//! The converted file lives inside the job's [`Workspace`], so the directory
//! must stay on disk until the last chunk has been sent. [`WorkspaceStream`]
//! holds the workspace next to the file reader and releases it as soon as the
//! reader reports end-of-file. If the client disconnects first, the body is
//! dropped and the workspace goes with it. Removal runs on the blocking pool
//! in both cases.

use crate::workspace::Workspace;
use axum::body::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Chunks of a produced file; releases the workspace once fully read.
pub struct WorkspaceStream {
    inner: ReaderStream<File>,
    workspace: Option<Workspace>,
}

impl WorkspaceStream {
    pub fn new(file: File, workspace: Workspace) -> Self {
        Self {
            inner: ReaderStream::new(file),
            workspace: Some(workspace),
        }
    }

    /// Whether the workspace is still held.
    pub fn holds_workspace(&self) -> bool {
        self.workspace.is_some()
    }
}

impl Stream for WorkspaceStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = polled {
            if let Some(workspace) = self.workspace.take() {
                workspace.release_in_background();
            }
        }
        polled
    }
}

impl Drop for WorkspaceStream {
    fn drop(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            workspace.release_in_background();
        }
    }
}
