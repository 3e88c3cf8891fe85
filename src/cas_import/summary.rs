//! Statement totals.

use crate::models::{
    AccountsSummary, DematAccount, HoldingsSummary, InsurancePolicy, MutualFundFolio, Summary,
};

/// Count and sum every bucket. Pure; totals are exact decimal sums.
pub fn summarize(
    demat: &[DematAccount],
    funds: &[MutualFundFolio],
    insurance: &[InsurancePolicy],
) -> Summary {
    let mut accounts = AccountsSummary::default();
    let mut holdings = HoldingsSummary::default();

    for account in demat {
        accounts.demat.add(account.value());

        let buckets = [
            (&mut holdings.equities, &account.holdings().equities),
            (&mut holdings.demat_mutual_funds, &account.holdings().demat_mutual_funds),
            (&mut holdings.corporate_bonds, &account.holdings().corporate_bonds),
            (&mut holdings.government_securities, &account.holdings().government_securities),
            (&mut holdings.aifs, &account.holdings().aifs),
        ];
        for (summary, rows) in buckets {
            for row in rows {
                summary.add(row.value);
            }
        }
    }
    for folio in funds {
        accounts.mutual_funds.add(folio.value());
    }
    for policy in insurance {
        accounts.insurance.add(policy.value);
    }

    let total_value = accounts.demat.total_value
        + accounts.mutual_funds.total_value
        + accounts.insurance.total_value;

    Summary {
        accounts,
        holdings,
        total_value,
    }
}
