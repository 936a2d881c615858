use crate::error::Result;
use crate::traits::{FunctionSpec, LocalFunction};
use async_trait::async_trait;
use serde_json::{Map, Value};

type Handler = dyn Fn(&Map<String, Value>) -> Result<Value> + Send + Sync;

/// A [`LocalFunction`] backed by a plain synchronous closure.
pub struct FnFunction {
    spec: FunctionSpec,
    handler: Box<Handler>,
}

impl FnFunction {
    pub fn new<F>(spec: FunctionSpec, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            spec,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl LocalFunction for FnFunction {
    fn spec(&self) -> FunctionSpec {
        self.spec.clone()
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<Value> {
        (self.handler)(&arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ParamKind, ParamSpec, require_string};
    use serde_json::json;

    #[tokio::test]
    async fn closure_receives_bound_arguments() {
        let f = FnFunction::new(
            FunctionSpec::new("cancel_order", "Cancel an order by order ID.").param(
                ParamSpec::required("order_id", ParamKind::String, "The unique ID of the order."),
            ),
            |args| {
                let order_id = require_string(args, "order_id")?;
                Ok(json!({ "order_id": order_id, "status": "Cancelled" }))
            },
        );

        let args = f.spec().bind(&json!({ "order_id": "12345" })).expect("binds");
        let out = f.call(args).await.expect("call");
        assert_eq!(out, json!({ "order_id": "12345", "status": "Cancelled" }));
    }
}
