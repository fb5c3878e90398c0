//! `subscription` Move module integration.
//!
//! ```move
//! public fun subscribe(
//!     service: &mut Service,
//!     platform: &mut Platform,
//!     tier_level: u64,
//!     payment: Coin<SUI>,
//!     clock: &Clock,
//!     ctx: &mut TxContext,
//! );
//! ```

use sui_types::Identifier;
use sui_types::base_types::{ObjectID, ObjectRef};
use sui_types::programmable_transaction_builder::ProgrammableTransactionBuilder;
use sui_types::transaction::{Argument, Command, ObjectArg, ProgrammableTransaction};

use crate::config::SUBSCRIPTION_MODULE;
use crate::core::error::{Result, SuiError};

#[derive(Debug, Clone)]
pub struct SubscriptionContract {
    pub package_id: ObjectID,
}

impl SubscriptionContract {
    pub fn new(package_id: ObjectID) -> Self {
        Self { package_id }
    }

    /// Pay `price_mist` for `tier_level` from the user's own coins.
    ///
    /// All coins are merged into the first before the exact price is split
    /// off. The gas coin is never referenced, so the transaction can be paid
    /// for by a sponsor.
    pub fn subscribe(
        &self,
        service: ObjectArg,
        platform: ObjectArg,
        tier_level: u64,
        price_mist: u64,
        user_coins: &[ObjectRef],
        clock: ObjectArg,
    ) -> Result<ProgrammableTransaction> {
        let (first, rest) = user_coins
            .split_first()
            .ok_or_else(|| SuiError::NoCoins("subscription payment".to_string()))?;

        let mut ptb = ProgrammableTransactionBuilder::new();

        let primary = ptb.obj(ObjectArg::ImmOrOwnedObject(*first))?;
        if !rest.is_empty() {
            let others = rest
                .iter()
                .map(|coin| ptb.obj(ObjectArg::ImmOrOwnedObject(*coin)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            ptb.command(Command::MergeCoins(primary, others));
        }

        let amount = ptb.pure(price_mist)?;
        let split = ptb.command(Command::SplitCoins(primary, vec![amount]));
        let payment = match split {
            Argument::Result(index) => Argument::NestedResult(index, 0),
            other => other,
        };

        let args = vec![
            ptb.obj(service)?,
            ptb.obj(platform)?,
            ptb.pure(tier_level)?,
            payment,
            ptb.obj(clock)?,
        ];

        ptb.programmable_move_call(
            self.package_id,
            Identifier::new(SUBSCRIPTION_MODULE)?,
            Identifier::new("subscribe")?,
            vec![],
            args,
        );

        Ok(ptb.finish())
    }
}

#[cfg(test)]
mod tests {
    use sui_types::base_types::{ObjectDigest, SequenceNumber};

    use super::*;
    use crate::contracts::clock_arg;
    use crate::contracts::test_support::{move_calls, object, shared};

    fn coin(byte: u8) -> ObjectRef {
        (object(byte), SequenceNumber::from_u64(3), ObjectDigest::random())
    }

    fn contract() -> SubscriptionContract {
        SubscriptionContract::new(object(0xaa))
    }

    fn uses_gas_coin(pt: &ProgrammableTransaction) -> bool {
        pt.commands.iter().any(|command| match command {
            Command::SplitCoins(coin, _) => *coin == Argument::GasCoin,
            Command::MergeCoins(target, sources) => {
                *target == Argument::GasCoin || sources.contains(&Argument::GasCoin)
            }
            Command::MoveCall(call) => call.arguments.contains(&Argument::GasCoin),
            _ => false,
        })
    }

    #[test]
    fn multiple_coins_are_merged_before_split() {
        let pt = contract()
            .subscribe(shared(1), shared(2), 1, 500, &[coin(10), coin(11), coin(12)], clock_arg())
            .unwrap();

        assert!(matches!(pt.commands[0], Command::MergeCoins(_, ref others) if others.len() == 2));
        assert!(matches!(pt.commands[1], Command::SplitCoins(_, _)));
        assert_eq!(move_calls(&pt), vec![("subscription".into(), "subscribe".into(), 5)]);
        assert!(!uses_gas_coin(&pt));
    }

    #[test]
    fn single_coin_skips_merge() {
        let pt = contract()
            .subscribe(shared(1), shared(2), 1, 500, &[coin(10)], clock_arg())
            .unwrap();

        assert!(matches!(pt.commands[0], Command::SplitCoins(_, _)));
        match &pt.commands[1] {
            Command::MoveCall(call) => assert_eq!(call.arguments[3], Argument::NestedResult(0, 0)),
            other => panic!("expected move call, got {:?}", other),
        }
        assert!(!uses_gas_coin(&pt));
    }

    #[test]
    fn no_coins_is_an_error() {
        let result = contract().subscribe(shared(1), shared(2), 1, 500, &[], clock_arg());
        assert!(matches!(result, Err(SuiError::NoCoins(_))));
    }
}
