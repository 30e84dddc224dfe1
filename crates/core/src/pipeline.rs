//! 파이프라인 trait -- 모듈 생명주기 확장 포인트 정의
//!
//! [`Pipeline`]은 RPITIT 기반의 정적 trait이고, [`DynPipeline`]은
//! `Box<dyn DynPipeline>`으로 보관하기 위한 dyn-compatible 버전입니다.
//!
//! # 생명주기
//! ```text
//! Created → start() → Running → stop() → Stopped
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::TarunnerError;

/// 박싱된 Send future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 일부 기능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지 가능한 모듈이 구현하는 trait
///
/// 러너(입력 스케줄러)와 데몬의 포워더가 이 trait을 구현합니다.
pub trait Pipeline: Send + Sync {
    /// 모듈을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), TarunnerError>> + Send;

    /// 모듈을 정지합니다. 두 번째 호출은 아무 일도 하지 않아야 합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), TarunnerError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// dyn-compatible 파이프라인 trait
///
/// `Pipeline`은 RPITIT를 사용하므로 `dyn Pipeline`이 불가합니다.
/// `DynPipeline`은 `BoxFuture`를 반환하여 모듈을 동적으로 관리할 수 있게 합니다.
pub trait DynPipeline: Send + Sync {
    /// 모듈을 시작합니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), TarunnerError>>;

    /// 모듈을 정지합니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), TarunnerError>>;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

/// Pipeline을 구현한 타입은 자동으로 DynPipeline도 구현됩니다.
impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), TarunnerError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), TarunnerError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        starts: u32,
        stops: u32,
    }

    impl Pipeline for Counter {
        async fn start(&mut self) -> Result<(), TarunnerError> {
            self.starts += 1;
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), TarunnerError> {
            self.stops += 1;
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            if self.starts > self.stops {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy("not running".to_owned())
            }
        }
    }

    #[tokio::test]
    async fn pipeline_is_usable_through_dyn() {
        let mut boxed: Box<dyn DynPipeline> = Box::new(Counter {
            starts: 0,
            stops: 0,
        });
        assert!(!boxed.health_check().await.is_healthy());
        boxed.start().await.unwrap();
        assert!(boxed.health_check().await.is_healthy());
        boxed.stop().await.unwrap();
        assert_eq!(
            boxed.health_check().await,
            HealthStatus::Unhealthy("not running".to_owned())
        );
    }

    #[test]
    fn health_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(
            HealthStatus::Degraded("slow".to_owned()).to_string(),
            "degraded: slow"
        );
    }
}
