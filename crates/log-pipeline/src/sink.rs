//! 채널 싱크 -- 레코드 배치를 bounded mpsc 채널로 전달합니다.

use tokio::sync::mpsc;

use tarunner_core::error::SinkError;
use tarunner_core::pipeline::BoxFuture;
use tarunner_core::record::{LogRecord, RecordSink};

/// bounded mpsc 채널로 배치를 보내는 싱크
///
/// 채널이 가득 차면 `consume`이 대기하고, 수신측이 닫히면 [`SinkError::Closed`]를 반환합니다.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<LogRecord>>,
}

impl ChannelSink {
    /// 기존 송신측으로 싱크를 만듭니다.
    pub fn new(tx: mpsc::Sender<Vec<LogRecord>>) -> Self {
        Self { tx }
    }

    /// 주어진 용량의 채널과 싱크를 함께 만듭니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<LogRecord>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl RecordSink for ChannelSink {
    fn consume(&self, batch: Vec<LogRecord>) -> BoxFuture<'_, Result<(), SinkError>> {
        Box::pin(async move {
            if batch.is_empty() {
                return Ok(());
            }
            self.tx.send(batch).await.map_err(|_| SinkError::Closed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_batches() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.consume(vec![LogRecord::new("a"), LogRecord::new("b")])
            .await
            .unwrap();
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].body, "b");
    }

    #[tokio::test]
    async fn empty_batch_is_not_sent() {
        let (sink, mut rx) = ChannelSink::channel(1);
        sink.consume(Vec::new()).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_receiver_is_error() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        let err = sink.consume(vec![LogRecord::new("x")]).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }
}
