use insider_core::{
    Cell, Config, DateBasis, Direction, DirectionSelection, FlagColumns, GroupVerdict, RevisionStatus, Source,
    Table,
};
use insider_flagging::{partition, read_verdict, FlaggingEngine, ToleranceConfig, ToleranceEvaluator};
use insider_ingestion::policy_for;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use std::collections::HashSet;

const HEADER: [&str; 6] = ["issuer", "ticker", "buyer", "filing_date", "price", "transaction_code"];
const FI_HEADER: [&str; 7] = ["Emittent", "Person i ledande ställning", "Karaktär", "ISIN", "Publiceringsdatum", "Pris", "Status"];

#[derive(Debug, Clone)]
struct Row {
    issuer: &'static str,
    buyer: &'static str,
    day: u32,
    /// Price in cents; `None` leaves the cell empty.
    cents: Option<u32>,
    code: &'static str,
}

fn row_strategy() -> impl Strategy<Value = Row> {
    (
        prop::sample::select(vec!["X", "Y"]),
        prop::sample::select(vec!["A", "B", "C", "D"]),
        11u32..14,
        prop::option::of(995u32..1010),
        prop::sample::select(vec!["P", "S", "M"]),
    )
        .prop_map(|(issuer, buyer, day, cents, code)| Row {
            issuer,
            buyer,
            day,
            cents,
            code,
        })
}

fn make_table(rows: &[Row]) -> Table {
    let mut table = Table::new(HEADER);
    for row in rows {
        let price = row
            .cents
            .map(|c| format!("{}.{:02}", c / 100, c % 100))
            .unwrap_or_default();
        table
            .push_row(vec![
                Cell::from(row.issuer),
                Cell::from(row.issuer),
                Cell::from(row.buyer),
                Cell::from(format!("2025-08-{:02}", row.day)),
                Cell::from(price),
                Cell::from(row.code),
            ])
            .unwrap();
    }
    table
}

#[derive(Debug, Clone)]
struct FiRow {
    pdmr: &'static str,
    nature: &'static str,
    isin: &'static str,
    cents: u32,
    status: &'static str,
}

fn fi_row_strategy() -> impl Strategy<Value = FiRow> {
    (
        prop::sample::select(vec!["Anna", "Bo", "Cay"]),
        prop::sample::select(vec!["Förvärv", "Avyttring", "Teckning"]),
        prop::sample::select(vec!["SE0000000001", "SE0000000002"]),
        995u32..1005,
        prop::sample::select(vec!["Notification", "Revised", "History"]),
    )
        .prop_map(|(pdmr, nature, isin, cents, status)| FiRow {
            pdmr,
            nature,
            isin,
            cents,
            status,
        })
}

fn make_fi_table(rows: &[FiRow]) -> Table {
    let mut table = Table::new(FI_HEADER);
    for row in rows {
        table
            .push_row(vec![
                Cell::from("Acme AB"),
                Cell::from(row.pdmr),
                Cell::from(row.nature),
                Cell::from(row.isin),
                Cell::from("11/08/2025"),
                Cell::from(format!("{},{:02}", row.cents / 100, row.cents % 100)),
                Cell::from(row.status),
            ])
            .unwrap();
    }
    table
}

fn make_engine() -> FlaggingEngine {
    let mut config = Config::default();
    config.flagging.directions = DirectionSelection::Both;
    FlaggingEngine::new(config).unwrap()
}

fn column_verdicts(table: &Table, names: FlagColumns) -> Vec<GroupVerdict> {
    (0..table.len())
        .map(|row| read_verdict(table, names, row).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_grouping_is_a_partition(rows in prop::collection::vec(row_strategy(), 0..24)) {
        let config = Config::default();
        let table = make_table(&rows);
        let policy = policy_for(Source::Us, &config).unwrap();
        let normalized = policy.normalize(&table, DateBasis::Publication).unwrap();
        let resolved = policy.deduplicate(&normalized.records);

        let mut seen = HashSet::new();
        for direction in Direction::ALL {
            let groups = partition(policy.as_ref(), &normalized.records, &resolved.working, direction);
            for (key, group) in &groups {
                for member in &group.members {
                    prop_assert_eq!(member.direction, Some(direction));
                    prop_assert_eq!(&policy.group_key(member), key);
                    prop_assert!(seen.insert((direction, member.row)), "row {} in two groups", member.row);
                }
            }
        }
        let directed = normalized.records.iter().filter(|r| r.direction.is_some()).count();
        prop_assert_eq!(seen.len(), directed);
    }

    #[test]
    fn test_tolerance_or_law(
        cents in prop::collection::vec(0u32..5000, 1..8),
        parties in 0u32..5,
        abs_tol in 0.0f64..0.5,
        pct_tol in 0.0f64..0.05,
    ) {
        let prices: Vec<f64> = cents.iter().map(|&c| f64::from(c) / 100.0).collect();
        let evaluator = ToleranceEvaluator::new(ToleranceConfig {
            abs_tol,
            pct_tol,
            min_parties: 2,
            min_priced: 1,
        });
        let eval = evaluator.evaluate_parts(parties, &prices);
        let span = eval.span.unwrap();

        prop_assert_eq!(eval.abs_ok, span.span_abs <= abs_tol + 1e-9);
        prop_assert_eq!(eval.pct_ok, span.median > 0.0 && span.span_pct <= pct_tol + 1e-9);
        prop_assert_eq!(eval.is_match(), parties >= 2 && (eval.abs_ok || eval.pct_ok));
        if eval.is_match() {
            prop_assert_eq!(eval.verdict.distinct_parties, parties);
            prop_assert_eq!(eval.verdict.basis.as_str(), if eval.abs_ok { "abs" } else { "pct" });
        } else {
            prop_assert!(eval.verdict.is_default());
        }
    }

    #[test]
    fn test_flagging_is_idempotent(rows in prop::collection::vec(row_strategy(), 0..24)) {
        let engine = make_engine();
        let mut table = make_table(&rows);

        let first = engine.flag(&mut table, Source::Us).unwrap();
        let snapshot: Vec<Vec<GroupVerdict>> = [FlagColumns::BUY, FlagColumns::SELL, FlagColumns::LEGACY]
            .into_iter()
            .map(|names| column_verdicts(&table, names))
            .collect();
        let width = table.columns().len();

        let second = engine.flag(&mut table, Source::Us).unwrap();
        let rerun: Vec<Vec<GroupVerdict>> = [FlagColumns::BUY, FlagColumns::SELL, FlagColumns::LEGACY]
            .into_iter()
            .map(|names| column_verdicts(&table, names))
            .collect();

        prop_assert_eq!(first, second);
        prop_assert_eq!(width, table.columns().len());
        prop_assert_eq!(snapshot, rerun);
    }

    #[test]
    fn test_default_fill_and_alias_consistency(rows in prop::collection::vec(row_strategy(), 1..24)) {
        let engine = make_engine();
        let mut table = make_table(&rows);
        engine.flag(&mut table, Source::Us).unwrap();

        let buys = column_verdicts(&table, FlagColumns::BUY);
        let sells = column_verdicts(&table, FlagColumns::SELL);
        prop_assert_eq!(&column_verdicts(&table, FlagColumns::LEGACY), &buys);

        for (row, input) in rows.iter().enumerate() {
            match input.code {
                "P" => prop_assert!(sells[row].is_default()),
                "S" => prop_assert!(buys[row].is_default()),
                _ => {
                    prop_assert!(buys[row].is_default());
                    prop_assert!(sells[row].is_default());
                }
            }
        }
    }

    #[test]
    fn test_fi_working_set_partition_and_default_fill(
        rows in prop::collection::vec(fi_row_strategy(), 1..16),
        keep_history in any::<bool>(),
    ) {
        let mut config = Config::default();
        config.flagging.directions = DirectionSelection::Both;
        config.fi.keep_history = keep_history;

        let table = make_fi_table(&rows);
        let policy = policy_for(Source::Fi, &config).unwrap();
        let normalized = policy.normalize(&table, DateBasis::Publication).unwrap();
        let resolved = policy.deduplicate(&normalized.records);

        let mut seen = HashSet::new();
        for direction in Direction::ALL {
            let groups = partition(policy.as_ref(), &normalized.records, &resolved.working, direction);
            for group in groups.values() {
                for member in &group.members {
                    prop_assert!(seen.insert(member.row));
                    prop_assert!(keep_history || member.revision_status != Some(RevisionStatus::History));
                }
            }
        }
        prop_assert_eq!(seen.len(), resolved.working.len());

        let mut flagged = table.clone();
        FlaggingEngine::new(config).unwrap().flag(&mut flagged, Source::Fi).unwrap();
        let buys = column_verdicts(&flagged, FlagColumns::BUY);
        let sells = column_verdicts(&flagged, FlagColumns::SELL);
        prop_assert_eq!(&column_verdicts(&flagged, FlagColumns::LEGACY), &buys);
        for (row, input) in rows.iter().enumerate() {
            match input.nature {
                "Förvärv" => prop_assert!(sells[row].is_default()),
                "Avyttring" => prop_assert!(buys[row].is_default()),
                _ => {
                    prop_assert!(buys[row].is_default());
                    prop_assert!(sells[row].is_default());
                }
            }
        }
    }
}
