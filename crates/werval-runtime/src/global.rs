//! Application global object
//!
//! [`Global`] is the extension point applications use to customize how filter
//! and controller instances are obtained, how controller methods are invoked
//! and how errors are turned into outcomes. Every method has a default.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};
use werval_api::{
    Application, Context, ControllerInstance, ControllerType, Filter, FilterType, Outcome,
    Request, Result, WervalError,
};

/// Application lifecycle and request processing hooks
#[async_trait]
pub trait Global: Send + Sync {
    /// Called once the application is assembled
    #[allow(unused_variables)]
    fn on_activate(&self, application: &dyn Application) {}

    /// Called when the application is shut down
    #[allow(unused_variables)]
    fn on_passivate(&self, application: &dyn Application) {}

    /// Filter instance for a filter type
    ///
    /// Plugin-provided instances first, then the filter type constructor.
    fn filter_instance(
        &self,
        application: &dyn Application,
        filter: &FilterType,
    ) -> Result<Arc<dyn Filter>> {
        application
            .plugins()
            .filter(filter.name())
            .or_else(|| filter.instantiate())
            .ok_or_else(|| WervalError::FilterInstantiation {
                filter: filter.name().to_string(),
                reason: "no constructor and no plugin provides it".to_string(),
            })
    }

    /// Controller instance for a controller type
    #[allow(unused_variables)]
    fn controller_instance(
        &self,
        application: &dyn Application,
        controller: &ControllerType,
    ) -> Result<ControllerInstance> {
        controller.new_instance()
    }

    /// Invoke the routed controller method
    async fn invoke_controller_method(
        &self,
        context: Context,
        controller: ControllerInstance,
    ) -> Result<Outcome> {
        let method = Arc::clone(context.route().controller_method());
        method.invoke(controller, context).await
    }

    /// Outcome answered when processing a request failed
    #[allow(unused_variables)]
    fn on_request_error(
        &self,
        application: &dyn Application,
        request: &Request,
        error: WervalError,
    ) -> Outcome {
        let status = error.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        if status.is_server_error() {
            error!(
                request_id = request.identity(),
                method = %request.method(),
                path = request.path(),
                wiring = error.is_wiring_error(),
                error = %error,
                "Request failed"
            );
            Outcome::text(status, format!("{} {reason}\n", status.as_u16()))
        } else {
            warn!(
                request_id = request.identity(),
                method = %request.method(),
                path = request.path(),
                error = %error,
                "Request rejected"
            );
            Outcome::text(status, format!("{} {reason}: {error}\n", status.as_u16()))
        }
    }
}

/// Global using every default behaviour
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGlobal;

#[async_trait]
impl Global for DefaultGlobal {
    fn on_activate(&self, _application: &dyn Application) {
        info!("Application activated");
    }

    fn on_passivate(&self, _application: &dyn Application) {
        info!("Application passivated");
    }
}
