//! Position sizing calculator.

use anyhow::{bail, Result};
use trading_risk::{PositionSizer, RiskConfig};

use crate::cli::SizeArgs;

pub fn run(args: SizeArgs, risk: &RiskConfig) -> Result<()> {
    let lot_size = args.lot_size.unwrap_or(risk.lot_size);
    let max_lots = args.max_lots.unwrap_or(risk.max_lots);
    let risk_fraction = args.risk_fraction.unwrap_or(risk.risk_fraction);
    let sizer = PositionSizer::new(risk.required_margin_rate);

    let Some(per_lot) = sizer.margin_per_lot(args.price, lot_size) else {
        bail!("margin per lot overflows for price {} and lot size {}", args.price, lot_size);
    };
    let lots = sizer.lots(args.margin, args.price, lot_size, max_lots, risk_fraction);

    println!("Position size");
    println!("{}", "═".repeat(40));
    println!("  Available margin: ₹{}", args.margin);
    println!("  Price:            ₹{}", args.price);
    println!("  Lot size:         {}", lot_size);
    println!("  Margin rate:      {}%", (sizer.margin_rate() * rust_decimal::Decimal::ONE_HUNDRED).normalize());
    println!("  Margin per lot:   ₹{}", per_lot.round_dp(2));
    println!("  Risk fraction:    {}", risk_fraction);
    println!("  Max lots:         {}", max_lots);
    println!("{}", "─".repeat(40));
    println!("  Lots:             {}", lots);
    println!("  Quantity:         {}", PositionSizer::quantity(lots, lot_size));
    Ok(())
}
