//! Profit engine — §4.8.
//!
//! Given a snapshot of a user's reserves and oracle metadata, selects the
//! debt/collateral asset pair a liquidation would target and simulates the
//! exact USD outcome. Every step up to the `net >= minProfitUsd` decision is
//! integer math over `U256`/`UsdFixed`; no `f64` appears on this path.

use alloy::primitives::{Address, U256};

use crate::error::{CoreError, CoreResult};
use crate::types::{ReserveMeta, UsdFixed, UserReserve};
use crate::u256_math::{self, BPS_DENOMINATOR};

/// One reserve a user holds, paired with its protocol metadata.
#[derive(Debug, Clone)]
pub struct PositionReserve {
    pub meta: ReserveMeta,
    pub user: UserReserve,
}

#[derive(Debug, Clone)]
pub struct ProfitConfig {
    pub close_factor_bps: u16,
    pub min_profit_usd: UsdFixed,
    pub min_repay_usd: UsdFixed,
    pub max_slippage_bps: u16,
    pub gas_cost_usd: UsdFixed,
}

impl Default for ProfitConfig {
    fn default() -> Self {
        Self {
            close_factor_bps: 5_000,
            min_profit_usd: UsdFixed::from_millionths(10, 0),
            min_repay_usd: UsdFixed::from_millionths(0, 500_000),
            max_slippage_bps: 100,
            gas_cost_usd: UsdFixed::from_millionths(0, 30_000),
        }
    }
}

/// Full breakdown of a simulated liquidation, in the units spec.md §4.8
/// names: repay/seize as raw on-chain amounts, the rest as `UsdFixed`.
#[derive(Debug, Clone)]
pub struct ProfitSimulation {
    pub debt_asset: Address,
    pub collateral_asset: Address,
    pub repay: U256,
    pub repay_usd: UsdFixed,
    pub seize: U256,
    pub seize_usd: UsdFixed,
    pub gross: UsdFixed,
    pub slippage_cost: UsdFixed,
    pub net: UsdFixed,
}

impl ProfitSimulation {
    pub fn is_profitable(&self, min_profit_usd: UsdFixed) -> bool {
        self.net >= min_profit_usd
    }
}

/// Active, non-frozen reserve with the largest `debtValueBase`.
fn select_debt_asset(reserves: &[PositionReserve]) -> Option<&PositionReserve> {
    reserves
        .iter()
        .filter(|r| r.meta.is_active && !r.meta.is_frozen && !r.user.total_debt().is_zero())
        .max_by_key(|r| UsdFixed::from_amount(r.user.total_debt(), r.meta.price_base, r.meta.decimals))
}

/// Usable collateral, preferring the highest liquidation bonus, tie-broken by
/// larger collateral USD value.
fn select_collateral_asset(reserves: &[PositionReserve]) -> Option<&PositionReserve> {
    reserves
        .iter()
        .filter(|r| {
            !r.user.a_token_balance.is_zero()
                && r.user.used_as_collateral
                && r.meta.is_active
                && !r.meta.is_frozen
        })
        .max_by_key(|r| {
            (
                r.meta.liquidation_bonus_bps,
                UsdFixed::from_amount(r.user.a_token_balance, r.meta.price_base, r.meta.decimals),
            )
        })
}

/// Simulate a liquidation over `reserves` and decide profitability per §4.8.
/// Returns `Err(CoreError::Unprofitable)` for every rejection path (missing
/// asset, dust guard) rather than a bool, so the caller always has a reason.
pub fn simulate(reserves: &[PositionReserve], config: &ProfitConfig) -> CoreResult<ProfitSimulation> {
    let debt = select_debt_asset(reserves).ok_or_else(|| CoreError::Unprofitable {
        reason: "no_debt_asset".into(),
    })?;
    let collateral = select_collateral_asset(reserves).ok_or_else(|| CoreError::Unprofitable {
        reason: "no_collateral_asset".into(),
    })?;

    let total_debt = debt.user.total_debt();
    let close_factor_amount = (total_debt * U256::from(config.close_factor_bps)) / BPS_DENOMINATOR;
    let repay = u256_math::min(total_debt, close_factor_amount);
    let repay_usd = UsdFixed::from_amount(repay, debt.meta.price_base, debt.meta.decimals);

    if repay.is_zero() || repay_usd < config.min_repay_usd {
        return Err(CoreError::Unprofitable { reason: "dust".into() });
    }

    let bonus_factor = U256::from(10_000u32 + collateral.meta.liquidation_bonus_bps as u32);
    let numerator = repay * bonus_factor * debt.meta.price_base * u256_math::pow10(collateral.meta.decimals);
    let denominator = BPS_DENOMINATOR * collateral.meta.price_base * u256_math::pow10(debt.meta.decimals);
    let seize = if denominator.is_zero() { U256::ZERO } else { numerator / denominator };
    let seize_usd = UsdFixed::from_amount(seize, collateral.meta.price_base, collateral.meta.decimals);

    let gross = seize_usd - repay_usd;
    let slippage_cost = seize_usd.mul_bps(config.max_slippage_bps as u32);
    let net = gross - slippage_cost - config.gas_cost_usd;

    Ok(ProfitSimulation {
        debt_asset: debt.meta.asset,
        collateral_asset: collateral.meta.asset,
        repay,
        repay_usd,
        seize,
        seize_usd,
        gross,
        slippage_cost,
        net,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(asset: u8, decimals: u8, price_base: u64, bonus_bps: u16) -> ReserveMeta {
        ReserveMeta {
            asset: Address::repeat_byte(asset),
            symbol: "TEST".into(),
            decimals,
            liquidation_threshold_bps: 8_500,
            liquidation_bonus_bps: bonus_bps,
            is_active: true,
            is_frozen: false,
            price_base: U256::from(price_base),
            usage_as_collateral_enabled: true,
        }
    }

    fn config() -> ProfitConfig {
        ProfitConfig {
            close_factor_bps: 5_000,
            min_profit_usd: UsdFixed::from_millionths(10, 0),
            min_repay_usd: UsdFixed::from_millionths(0, 500_000),
            max_slippage_bps: 100,
            gas_cost_usd: UsdFixed::from_millionths(0, 30_000),
        }
    }

    /// S1 — dust reject: 0.0005 USDC of debt at $1.00 is far below the
    /// default $0.50 `minRepayUsd` floor.
    #[test]
    fn s1_dust_reject() {
        let debt_meta = meta(1, 6, 100_000_000, 0);
        let reserves = vec![PositionReserve {
            meta: debt_meta.clone(),
            user: UserReserve {
                a_token_balance: U256::ZERO,
                variable_debt: U256::from(500u64),
                stable_debt: U256::ZERO,
                used_as_collateral: false,
            },
        }];
        let err = simulate(&reserves, &config()).unwrap_err();
        match err {
            CoreError::Unprofitable { reason } => assert_eq!(reason, "dust"),
            other => panic!("expected dust rejection, got {other:?}"),
        }
    }

    #[test]
    fn profitable_liquidation_computes_positive_net() {
        let debt_meta = meta(1, 6, 100_000_000, 0); // USDC debt @ $1.00
        let coll_meta = meta(2, 18, 200_000_000_000, 1_000); // WETH collateral @ $2000, 10% bonus
        let reserves = vec![
            PositionReserve {
                meta: debt_meta,
                user: UserReserve {
                    a_token_balance: U256::ZERO,
                    variable_debt: U256::from(1_000_000_000u64), // 1000 USDC
                    stable_debt: U256::ZERO,
                    used_as_collateral: false,
                },
            },
            PositionReserve {
                meta: coll_meta,
                user: UserReserve {
                    a_token_balance: U256::from(10_000_000_000_000_000_000u128), // 10 WETH
                    variable_debt: U256::ZERO,
                    stable_debt: U256::ZERO,
                    used_as_collateral: true,
                },
            },
        ];
        let sim = simulate(&reserves, &config()).unwrap();
        // repay = 500 USDC (50% close factor) -> $500
        assert_eq!(sim.repay_usd, UsdFixed::from_millionths(500, 0));
        assert!(!sim.net.is_negative());
        assert!(sim.is_profitable(config().min_profit_usd));
    }

    #[test]
    fn selects_largest_debt_and_highest_bonus_collateral() {
        let small_debt = meta(1, 6, 100_000_000, 0);
        let big_debt = meta(2, 6, 100_000_000, 0);
        let low_bonus_coll = meta(3, 18, 100_000_000_000, 500);
        let high_bonus_coll = meta(4, 18, 100_000_000_000, 1_500);
        let reserves = vec![
            PositionReserve {
                meta: small_debt,
                user: UserReserve {
                    a_token_balance: U256::ZERO,
                    variable_debt: U256::from(100_000_000u64),
                    stable_debt: U256::ZERO,
                    used_as_collateral: false,
                },
            },
            PositionReserve {
                meta: big_debt.clone(),
                user: UserReserve {
                    a_token_balance: U256::ZERO,
                    variable_debt: U256::from(10_000_000_000u64),
                    stable_debt: U256::ZERO,
                    used_as_collateral: false,
                },
            },
            PositionReserve {
                meta: low_bonus_coll,
                user: UserReserve {
                    a_token_balance: U256::from(1_000_000_000_000_000_000u128),
                    variable_debt: U256::ZERO,
                    stable_debt: U256::ZERO,
                    used_as_collateral: true,
                },
            },
            PositionReserve {
                meta: high_bonus_coll.clone(),
                user: UserReserve {
                    a_token_balance: U256::from(1_000_000_000_000_000_000u128),
                    variable_debt: U256::ZERO,
                    stable_debt: U256::ZERO,
                    used_as_collateral: true,
                },
            },
        ];
        let sim = simulate(&reserves, &config()).unwrap();
        assert_eq!(sim.debt_asset, big_debt.asset);
        assert_eq!(sim.collateral_asset, high_bonus_coll.asset);
    }

    #[test]
    fn missing_collateral_rejects_with_reason() {
        let debt_meta = meta(1, 6, 100_000_000, 0);
        let reserves = vec![PositionReserve {
            meta: debt_meta,
            user: UserReserve {
                a_token_balance: U256::ZERO,
                variable_debt: U256::from(1_000_000_000u64),
                stable_debt: U256::ZERO,
                used_as_collateral: false,
            },
        }];
        let err = simulate(&reserves, &config()).unwrap_err();
        match err {
            CoreError::Unprofitable { reason } => assert_eq!(reason, "no_collateral_asset"),
            other => panic!("expected no_collateral_asset, got {other:?}"),
        }
    }

    /// Property 7: identical inputs produce bit-identical output, run to run.
    #[test]
    fn exact_integer_math_is_deterministic_across_runs() {
        let debt_meta = meta(1, 6, 100_000_000, 0);
        let coll_meta = meta(2, 18, 200_000_000_000, 1_000);
        let reserves = vec![
            PositionReserve {
                meta: debt_meta,
                user: UserReserve {
                    a_token_balance: U256::ZERO,
                    variable_debt: U256::from(1_000_000_000u64),
                    stable_debt: U256::ZERO,
                    used_as_collateral: false,
                },
            },
            PositionReserve {
                meta: coll_meta,
                user: UserReserve {
                    a_token_balance: U256::from(10_000_000_000_000_000_000u128),
                    variable_debt: U256::ZERO,
                    stable_debt: U256::ZERO,
                    used_as_collateral: true,
                },
            },
        ];
        let a = simulate(&reserves, &config()).unwrap();
        let b = simulate(&reserves, &config()).unwrap();
        assert_eq!(a.repay, b.repay);
        assert_eq!(a.seize, b.seize);
        assert_eq!(a.net.raw(), b.net.raw());
    }
}
