//! vigil-core
//!
//! Core of a VPN client: ordered execution of control-plane tasks and the
//! encrypted settings file.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, DeletePolicy, TaskState, SettingsKey）
//! - **task**: Task trait と組み込みタスク（TaskFunction, TaskGroup, ApiCallTask）
//! - **queue**: TaskRecord と RunQueue（削除ポリシーの適用）
//! - **app**: TaskScheduler と TaskHandle
//! - **ports**: 外部との境界（KeyStore, RequestTransport, ErrorSink）
//! - **impls**: ports の実装（MemoryKeyStore, FileKeyStore, LogErrorSink）
//! - **settings**: 暗号化設定ファイル（CryptoSettings, SettingsFile）
//! - **config**: TOML 設定
//! - **error**: エラー型
//! - **observability**: 診断用スナップショット

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod settings;
pub mod task;

pub use app::{TaskHandle, TaskOutcome, TaskScheduler};
pub use config::VigilConfig;
pub use domain::{DeletePolicy, SettingsKey, TaskId, TaskState};
pub use error::{ConfigError, KeyStoreError, NetworkError, SettingsError};
pub use settings::{CryptoSettings, SettingsFile, SettingsMap, Version};
pub use task::{ApiCallTask, Task, TaskContext, TaskFunction, TaskGroup};
