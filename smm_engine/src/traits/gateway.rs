use panel_client::{OrderParams, PanelApi, PanelApiError, PanelBalance, PanelConfig, PlacedOrder, RawService};

use crate::db_types::Provider;

/// The slice of the panel protocol the engine actually drives. [`PanelApi`] is the production implementation; tests
/// substitute canned gateways.
#[allow(async_fn_in_trait)]
pub trait PanelGateway {
    async fn list_services(&self) -> Result<Vec<RawService>, PanelApiError>;

    async fn balance(&self) -> Result<PanelBalance, PanelApiError>;

    async fn place_order(&self, params: &OrderParams) -> Result<PlacedOrder, PanelApiError>;
}

/// Builds a gateway from a provider's stored credentials. Implemented for free by any
/// `Fn(&Provider) -> Result<G, PanelApiError>` closure, which is how tests inject canned gateways.
pub trait GatewayFactory {
    type Gateway: PanelGateway;

    fn gateway_for(&self, provider: &Provider) -> Result<Self::Gateway, PanelApiError>;
}

impl<G, F> GatewayFactory for F
where
    G: PanelGateway,
    F: Fn(&Provider) -> Result<G, PanelApiError>,
{
    type Gateway = G;

    fn gateway_for(&self, provider: &Provider) -> Result<G, PanelApiError> {
        self(provider)
    }
}

/// The production gateway factory: an HTTP client against the provider's stored endpoint and key.
pub fn live_gateway(provider: &Provider) -> Result<PanelApi, PanelApiError> {
    let config = PanelConfig::new(provider.api_url.as_str(), provider.api_key.clone());
    PanelApi::new(config)
}

impl PanelGateway for PanelApi {
    async fn list_services(&self) -> Result<Vec<RawService>, PanelApiError> {
        PanelApi::list_services(self).await
    }

    async fn balance(&self) -> Result<PanelBalance, PanelApiError> {
        PanelApi::balance(self).await
    }

    async fn place_order(&self, params: &OrderParams) -> Result<PlacedOrder, PanelApiError> {
        PanelApi::place_order(self, params).await
    }
}
