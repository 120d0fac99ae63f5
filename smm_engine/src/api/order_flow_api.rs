use log::*;
use panel_client::OrderParams;
use serde_json::json;

use crate::{
    api::BonusApi,
    db_types::{Order, OrderStatus, Service, TxnReference},
    traits::{
        BonusStore,
        FulfilledOrder,
        GatewayFactory,
        OrderFlowError,
        OrderStore,
        PanelGateway,
        SettingsStore,
        WalletLedger,
    },
};

/// The order fulfillment pipeline: price, debit, place upstream, record. The one flow in the engine that touches the
/// wallet, the catalog and the upstream panel in a single operation.
pub struct OrderFlowApi<B, F> {
    db: B,
    bonus: BonusApi<B>,
    factory: F,
}

impl<B: Clone, F: Clone> Clone for OrderFlowApi<B, F> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), bonus: self.bonus.clone(), factory: self.factory.clone() }
    }
}

impl<B, F> OrderFlowApi<B, F>
where
    B: OrderStore + WalletLedger + BonusStore + SettingsStore,
    F: GatewayFactory,
{
    pub fn new(db: B, bonus: BonusApi<B>, factory: F) -> Self {
        Self { db, bonus, factory }
    }

    /// Places an order for `quantity` units of the given catalog service.
    ///
    /// The sequence is: fetch the service and its provider (both must be active), debit the customer the catalog
    /// rate, place the order upstream, then persist the order together with its transaction link and the lifetime
    /// spend bump. An upstream failure after the debit triggers a compensating refund, so the customer never pays
    /// for an order the provider did not accept.
    pub async fn create_order(
        &self,
        user_id: i64,
        service_id: i64,
        link: &str,
        quantity: i64,
    ) -> Result<Order, OrderFlowError> {
        let (service, provider) =
            self.db.fetch_active_service(service_id).await?.ok_or(OrderFlowError::ServiceUnavailable(service_id))?;
        check_quantity(&service, quantity)?;
        // Build the gateway before taking any money, so a bad provider config cannot leave a dangling debit.
        let gateway = self.factory.gateway_for(&provider)?;

        let charge = service.rate.per_thousand(quantity);
        let debit_txn =
            self.db.debit(user_id, charge, &format!("Order for {}", service.name), TxnReference::None).await?;
        debug!("🛒️ Debited {charge} from user {user_id} for service {} (txn {})", service.id, debit_txn.id);

        let params = OrderParams::new(service.service_id.as_str()).with_link(link).with_quantity(quantity);
        let placed = match gateway.place_order(&params).await {
            Ok(placed) => placed,
            Err(e) => return Err(self.refund_failed_order(user_id, &debit_txn.id, charge, e).await),
        };

        let cost = service.cost.per_thousand(quantity);
        let fulfilled = FulfilledOrder {
            user_id,
            provider_id: provider.id,
            service_id: service.id,
            provider_order_id: placed.order_id.clone(),
            quantity,
            charge,
            cost,
            link: link.to_string(),
            status: OrderStatus::Pending,
            request_data: json!({ "service": service.service_id, "link": link, "quantity": quantity }),
            response_data: placed.raw,
            debit_txn_id: debit_txn.id,
        };
        let order = match self.db.record_fulfilled_order(fulfilled).await {
            Ok(order) => order,
            Err(e) => {
                // The provider accepted the order but we could not write it down. The debit stands and the
                // provider will deliver, so this must not be refunded; it needs an operator.
                error!(
                    "💥️ Provider order {} (user {user_id}, service {}, debit txn {}) was placed upstream but could \
                     not be recorded locally: {e}. Manual reconciliation required.",
                    placed.order_id, service.id, debit_txn.id
                );
                return Err(e);
            },
        };
        info!("🛒️ Order {} placed for user {user_id}: {} x{quantity} for {charge}", order.id, service.name);

        // The spend bump may have pushed the user over the bonus threshold. A failure here must not undo a
        // successfully placed order.
        if let Err(e) = self.bonus.check_and_unlock(user_id).await {
            warn!("🛒️ Bonus unlock check failed for user {user_id}: {e}");
        }
        Ok(order)
    }

    pub async fn order_details(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    pub async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.db.orders_for_user(user_id).await
    }

    pub async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<Order, OrderFlowError> {
        self.db.update_order_status(order_id, status).await
    }

    /// Compensates a debit whose order the provider rejected. Returns the error the caller must surface: the
    /// upstream failure when the refund lands, or the far more serious [`OrderFlowError::RefundFailed`] when it
    /// does not.
    async fn refund_failed_order(
        &self,
        user_id: i64,
        debit_txn_id: &i64,
        charge: smm_common::Money,
        upstream: panel_client::PanelApiError,
    ) -> OrderFlowError {
        warn!("🛒️ Upstream order for user {user_id} failed: {upstream}. Refunding {charge}.");
        let description = format!("Refund for failed order: {upstream}");
        match self.db.credit(user_id, charge, &description, None).await {
            Ok(refund) => {
                info!("🛒️ Refunded {charge} to user {user_id} (txn {})", refund.id);
                OrderFlowError::Upstream(upstream)
            },
            Err(e) => {
                error!(
                    "💥️ Refund of {charge} to user {user_id} failed after the upstream order failed: {e}. The \
                     funding debit is txn {debit_txn_id}. Manual reconciliation required."
                );
                OrderFlowError::RefundFailed {
                    user_id,
                    amount: charge,
                    debit_txn_id: *debit_txn_id,
                    cause: e.to_string(),
                }
            },
        }
    }
}

fn check_quantity(service: &Service, quantity: i64) -> Result<(), OrderFlowError> {
    let min = service.min_quantity.unwrap_or(1);
    let max = service.max_quantity.unwrap_or(i64::MAX);
    if quantity < min.max(1) || quantity > max {
        return Err(OrderFlowError::QuantityOutOfRange { quantity, min: min.max(1), max });
    }
    Ok(())
}
