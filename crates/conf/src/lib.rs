//! tarunner 스탠자 설정 크레이트
//!
//! # 모듈 구성
//!
//! - [`stanza`]: `[name]` / `key = value` 형식의 `.conf` 파서
//! - [`input`]: inputs.conf 모델과 자식 프로세스용 입력 디스크립터 (XML)
//! - [`transform`]: transforms.conf 모델
//! - [`props`]: props.conf 모델, 종류 판별, 우선순위 정렬, 별칭 해석
//! - [`app`]: local/default 계층 로딩과 다중 앱 레이아웃
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! <app>/{local,default}/*.conf -> AppLoader -> parse_stanzas -> Input / Transform / Prop
//!                                                                       |
//!                                                          props::resolve (우선순위)
//! ```

pub mod app;
pub mod error;
pub mod input;
pub mod props;
pub mod stanza;
pub mod transform;

// --- 주요 타입 re-export ---

pub use app::{App, AppLoader, ConfFile};
pub use error::ConfError;
pub use input::{Input, Param, Params, read_inputs};
pub use props::{FieldAlias, Prop, PropKind, TransformChain, parse_alias, read_props, resolve};
pub use stanza::{Stanza, StanzaFile, parse_stanzas};
pub use transform::{Transform, read_transforms};
