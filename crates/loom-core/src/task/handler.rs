//! Handler trait - Task の本体
//!
//! # 2 つの書き方
//! - `Handler`: object-safe。`Value` をそのまま受け取り `TaskOutput` を返す
//! - `TypedHandler`: serde 型で input / output を受け渡す。`Typed<H>` で `Handler` に変換される
//!
//! `Typed<H>` は型消去の層で、Registry は `Arc<dyn Handler>` だけを保持します。

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Params, TaskError, TaskOutput};
use crate::codec::json;
use crate::effect::Effect;
use crate::schema::Value;

/// Handler はパラメータと input を受け取って output を返す
///
/// # 使用例
/// ```ignore
/// struct Upper;
///
/// #[async_trait]
/// impl Handler for Upper {
///     async fn handle(&self, _params: Params, input: Value, _effect: Arc<Effect>)
///         -> Result<TaskOutput, TaskError>
///     {
///         let text = input.as_str().unwrap_or_default().to_uppercase();
///         Ok(TaskOutput::single(text))
///     }
/// }
/// ```
///
/// input binding が無い、または対話的な端末から読まない場合 `input` は `Value::Void`。
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        params: Params,
        input: Value,
        effect: Arc<Effect>,
    ) -> Result<TaskOutput, TaskError>;
}

/// FnHandler は async クロージャを Handler にする
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Params, Value, Arc<Effect>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Params, Value, Arc<Effect>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send,
{
    async fn handle(
        &self,
        params: Params,
        input: Value,
        effect: Arc<Effect>,
    ) -> Result<TaskOutput, TaskError> {
        (self.f)(params, input, effect).await
    }
}

/// TypedHandler は serde 型で input / output を扱う Handler
///
/// - `Input` は input の Value から JSON データモデル経由で復元される
/// - `Output` は `output` binding に渡される。`null` にシリアライズされる値（`()` / `None`）は出力無し
///
/// # 使用例
/// ```ignore
/// #[derive(Deserialize)]
/// struct Order { items: Vec<f64> }
///
/// struct Total;
///
/// #[async_trait]
/// impl TypedHandler for Total {
///     type Input = Order;
///     type Output = f64;
///
///     async fn handle(&self, _params: Params, order: Order, _effect: Arc<Effect>)
///         -> Result<f64, TaskError>
///     {
///         Ok(order.items.iter().sum())
///     }
/// }
///
/// TaskSpec::new(Typed::new(Total));
/// ```
#[async_trait]
pub trait TypedHandler: Send + Sync {
    type Input: DeserializeOwned + Send;
    type Output: Serialize + Send;

    async fn handle(
        &self,
        params: Params,
        input: Self::Input,
        effect: Arc<Effect>,
    ) -> Result<Self::Output, TaskError>;
}

/// Typed は TypedHandler を Handler に変換するアダプタ
pub struct Typed<H> {
    handler: H,
    _marker: PhantomData<fn() -> H>,
}

impl<H: TypedHandler> Typed<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<H: TypedHandler> Handler for Typed<H> {
    async fn handle(
        &self,
        params: Params,
        input: Value,
        effect: Arc<Effect>,
    ) -> Result<TaskOutput, TaskError> {
        let input = json::to_json(&input).map_err(|e| TaskError::Input(e.to_string()))?;
        let input: H::Input =
            serde_json::from_value(input).map_err(|e| TaskError::Input(e.to_string()))?;

        let output = self.handler.handle(params, input, effect).await?;

        let output =
            serde_json::to_value(output).map_err(|e| TaskError::Output(e.to_string()))?;
        match json::from_json(output) {
            Value::Null => Ok(TaskOutput::none()),
            value => Ok(TaskOutput::single(value)),
        }
    }
}
