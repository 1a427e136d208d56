/// Transaction storage backends
/// The detector and resamplers only need per-date aggregates and the gross values
/// inside a date range, so both the in-memory and the partitioned table expose
/// exactly that through `TransactionSource`

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{DateRange, Transaction};

pub trait TransactionSource {
    /// Mean discount percentage per calendar date, ascending by date
    fn daily_discount_means(&self) -> Vec<(NaiveDate, f64)>;

    /// Gross values of transactions inside `range`, or of every transaction when `None`
    fn gross_values(&self, range: Option<DateRange>) -> Vec<f64>;

    /// Transaction count per calendar date inside `range`, ascending by date
    fn daily_counts(&self, range: Option<DateRange>) -> Vec<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn in_range(range: Option<DateRange>, date: NaiveDate) -> bool {
    range.map_or(true, |r| r.contains(date))
}

/// Partial (sum, count) aggregate of discount per date
#[derive(Clone, Copy, Debug, Default)]
struct DailyPartial {
    discount_sum: f64,
    count: usize,
}

fn aggregate_days<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    range: Option<DateRange>,
) -> BTreeMap<NaiveDate, DailyPartial> {
    let mut days: BTreeMap<NaiveDate, DailyPartial> = BTreeMap::new();
    for tx in transactions.filter(|tx| in_range(range, tx.date)) {
        let entry = days.entry(tx.date).or_default();
        entry.discount_sum += tx.discount_percent;
        entry.count += 1;
    }
    days
}

fn finish_means(days: BTreeMap<NaiveDate, DailyPartial>) -> Vec<(NaiveDate, f64)> {
    days.into_iter()
        .map(|(date, partial)| (date, partial.discount_sum / partial.count as f64))
        .collect()
}

/// Single in-memory table of transactions
#[derive(Clone, Debug, Default)]
pub struct InMemoryTable {
    transactions: Vec<Transaction>,
}

impl InMemoryTable {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        InMemoryTable { transactions }
    }
}

impl TransactionSource for InMemoryTable {
    fn daily_discount_means(&self) -> Vec<(NaiveDate, f64)> {
        finish_means(aggregate_days(self.transactions.iter(), None))
    }

    fn gross_values(&self, range: Option<DateRange>) -> Vec<f64> {
        self.transactions
            .iter()
            .filter(|tx| in_range(range, tx.date))
            .map(|tx| tx.full_value)
            .collect()
    }

    fn daily_counts(&self, range: Option<DateRange>) -> Vec<usize> {
        aggregate_days(self.transactions.iter(), range)
            .into_values()
            .map(|partial| partial.count)
            .collect()
    }

    fn len(&self) -> usize {
        self.transactions.len()
    }
}

/// Table split into partitions, aggregated the way a distributed engine does:
/// each partition groups its rows by date, the partial groups are shuffled
/// together and reduced. Rows keep their load-order id so the reduce step sums
/// in the same order as `InMemoryTable` and produces bit-identical means.
#[derive(Clone, Debug)]
pub struct PartitionedTable {
    partitions: Vec<Vec<(usize, Transaction)>>,
}

/// Discounts of one date gathered from every partition, tagged with row id
type DailyRows = BTreeMap<NaiveDate, Vec<(usize, f64)>>;

impl PartitionedTable {
    /// Distribute transactions round-robin over `num_partitions` (at least one)
    pub fn new(transactions: Vec<Transaction>, num_partitions: usize) -> Self {
        let num_partitions = num_partitions.max(1);
        let mut partitions: Vec<Vec<(usize, Transaction)>> = vec![Vec::new(); num_partitions];
        for (row, tx) in transactions.into_iter().enumerate() {
            partitions[row % num_partitions].push((row, tx));
        }
        PartitionedTable { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    fn partial_rows(partition: &[(usize, Transaction)], range: Option<DateRange>) -> DailyRows {
        let mut days = DailyRows::new();
        for (row, tx) in partition.iter().filter(|(_, tx)| in_range(range, tx.date)) {
            days.entry(tx.date).or_default().push((*row, tx.discount_percent));
        }
        days
    }

    fn merged_days(&self, range: Option<DateRange>) -> BTreeMap<NaiveDate, DailyPartial> {
        let mut shuffled = DailyRows::new();
        for partition in &self.partitions {
            for (date, rows) in Self::partial_rows(partition, range) {
                shuffled.entry(date).or_default().extend(rows);
            }
        }

        shuffled
            .into_iter()
            .map(|(date, mut rows)| {
                rows.sort_unstable_by_key(|(row, _)| *row);
                let partial = rows.iter().fold(DailyPartial::default(), |mut acc, (_, discount)| {
                    acc.discount_sum += discount;
                    acc.count += 1;
                    acc
                });
                (date, partial)
            })
            .collect()
    }
}

impl TransactionSource for PartitionedTable {
    fn daily_discount_means(&self) -> Vec<(NaiveDate, f64)> {
        finish_means(self.merged_days(None))
    }

    /// Values come back in load order so seeded resampling matches `InMemoryTable`
    fn gross_values(&self, range: Option<DateRange>) -> Vec<f64> {
        let mut rows: Vec<(usize, f64)> = self
            .partitions
            .iter()
            .flat_map(|partition| partition.iter())
            .filter(|(_, tx)| in_range(range, tx.date))
            .map(|(row, tx)| (*row, tx.full_value))
            .collect();
        rows.sort_unstable_by_key(|(row, _)| *row);
        rows.into_iter().map(|(_, value)| value).collect()
    }

    fn daily_counts(&self, range: Option<DateRange>) -> Vec<usize> {
        self.merged_days(range)
            .into_values()
            .map(|partial| partial.count)
            .collect()
    }

    fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }
}
