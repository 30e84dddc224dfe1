//! 실행 중인 자식 프로세스 목록
//!
//! 종료 시 등록된 모든 자식에게 SIGTERM을 보냅니다 (SIGKILL은 보내지 않음).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(not(unix))]
use tracing::warn;

/// 실행 중인 자식 프로세스 pid 목록 (복제 시 같은 목록을 공유)
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    pids: Mutex<HashMap<u64, u32>>,
}

impl ProcessRegistry {
    /// 빈 목록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn pids(&self) -> MutexGuard<'_, HashMap<u64, u32>> {
        // 오염된 잠금도 그대로 사용
        self.inner
            .pids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// pid를 등록하고 등록 id를 반환합니다.
    pub fn register(&self, pid: u32) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.pids().insert(id, pid);
        id
    }

    /// 등록을 해제합니다.
    pub fn deregister(&self, id: u64) -> Option<u32> {
        self.pids().remove(&id)
    }

    /// 등록된 프로세스 수
    pub fn len(&self) -> usize {
        self.pids().len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.pids().is_empty()
    }

    /// 등록된 프로세스 하나에 SIGTERM을 보냅니다.
    pub fn terminate(&self, id: u64) -> bool {
        let pid = self.pids().get(&id).copied();
        pid.is_some_and(send_sigterm)
    }

    /// 등록된 모든 프로세스에 SIGTERM을 보내고, 신호를 받은 수를 반환합니다.
    pub fn terminate_all(&self) -> usize {
        let pids: Vec<u32> = self.pids().values().copied().collect();
        pids.into_iter().filter(|pid| send_sigterm(*pid)).count()
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) only sends a signal; an already-exited pid yields ESRCH
    let result = unsafe { libc::kill(pid, libc::SIGTERM) };
    if result == 0 {
        true
    } else {
        tracing::debug!(
            pid,
            error = %std::io::Error::last_os_error(),
            "failed to signal child process"
        );
        false
    }
}

#[cfg(not(unix))]
fn send_sigterm(pid: u32) -> bool {
    warn!(pid, "process termination not supported on this platform");
    false
}
