//! Veo Factory：五条产品线的概念图批量生成、Veo 视频脚本和素材打包

pub mod api;
pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod factory;
pub mod generation;
pub mod host;
pub mod image;
pub mod render;
pub mod row;
pub mod scene;
pub mod state;

pub use error::{FactoryError, Result};
pub use factory::Factory;
