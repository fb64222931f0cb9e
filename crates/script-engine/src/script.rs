//! The trait user strategy scripts implement.

use pmm_core::{
    BuyOrderCompletedEvent, FundingPaymentCompletedEvent, OrderFilledEvent,
    SellOrderCompletedEvent,
};

use crate::context::ScriptContext;
use crate::error::ScriptResult;

/// A strategy-extension script.
///
/// Every hook is optional. Hooks run one at a time on the script's own
/// execution context; an `Err` or a panic is reported to the host as a
/// script failure and the script keeps receiving messages.
pub trait Script: Send {
    /// Name used in logs and the default status line
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Called once per host tick, after the context mirrors the snapshot.
    fn on_tick(&mut self, _ctx: &mut ScriptContext) -> ScriptResult<()> {
        Ok(())
    }

    fn on_order_filled(
        &mut self,
        _ctx: &mut ScriptContext,
        _event: &OrderFilledEvent,
    ) -> ScriptResult<()> {
        Ok(())
    }

    fn on_buy_order_completed(
        &mut self,
        _ctx: &mut ScriptContext,
        _event: &BuyOrderCompletedEvent,
    ) -> ScriptResult<()> {
        Ok(())
    }

    fn on_sell_order_completed(
        &mut self,
        _ctx: &mut ScriptContext,
        _event: &SellOrderCompletedEvent,
    ) -> ScriptResult<()> {
        Ok(())
    }

    fn on_funding_payment_completed(
        &mut self,
        _ctx: &mut ScriptContext,
        _event: &FundingPaymentCompletedEvent,
    ) -> ScriptResult<()> {
        Ok(())
    }

    /// Status text for the host. `None` or an empty string reports nothing.
    fn on_status(&mut self, _ctx: &ScriptContext) -> ScriptResult<Option<String>> {
        Ok(Some(format!("{} is active.", self.name())))
    }

    /// A user command other than the reserved `live` toggle.
    fn on_command(
        &mut self,
        _ctx: &mut ScriptContext,
        _cmd: &str,
        _args: &[String],
    ) -> ScriptResult<()> {
        Ok(())
    }

    /// The host is about to refresh its orders.
    fn on_order_refresh(&mut self, _ctx: &mut ScriptContext) -> ScriptResult<()> {
        Ok(())
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
