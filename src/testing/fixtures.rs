//! Pre-built TPC-H shaped datasets.

/// Column names of the TPC-H `NATION` table.
pub const NATION_HEADER: [&str; 4] = ["N_NATIONKEY", "N_NAME", "N_REGIONKEY", "N_COMMENT"];

/// Column names of the TPC-H `ORDERS` table.
pub const ORDERS_HEADER: [&str; 9] = [
    "O_ORDERKEY",
    "O_CUSTKEY",
    "O_ORDERSTATUS",
    "O_TOTALPRICE",
    "O_ORDERDATE",
    "O_ORDERPRIORITY",
    "O_CLERK",
    "O_SHIPPRIORITY",
    "O_COMMENT",
];

const NATIONS: [(&str, u8); 25] = [
    ("ALGERIA", 0),
    ("ARGENTINA", 1),
    ("BRAZIL", 1),
    ("CANADA", 1),
    ("EGYPT", 4),
    ("ETHIOPIA", 0),
    ("FRANCE", 3),
    ("GERMANY", 3),
    ("INDIA", 2),
    ("INDONESIA", 2),
    ("IRAN", 4),
    ("IRAQ", 4),
    ("JAPAN", 2),
    ("JORDAN", 4),
    ("KENYA", 0),
    ("MOROCCO", 0),
    ("MOZAMBIQUE", 0),
    ("PERU", 1),
    ("CHINA", 2),
    ("ROMANIA", 3),
    ("SAUDI ARABIA", 4),
    ("VIETNAM", 2),
    ("RUSSIA", 3),
    ("UNITED KINGDOM", 3),
    ("UNITED STATES", 1),
];

/// The 25 `NATION` rows. Comments contain commas, so they exercise quoting.
///
/// ```
/// use csvshard::testing::nation_rows;
///
/// let rows = nation_rows();
/// assert_eq!(rows.len(), 25);
/// assert_eq!(rows[24][1], "UNITED STATES");
/// ```
#[must_use]
pub fn nation_rows() -> Vec<Vec<String>> {
    NATIONS
        .iter()
        .enumerate()
        .map(|(key, (name, region))| {
            vec![
                key.to_string(),
                (*name).to_string(),
                region.to_string(),
                format!("nation {key}, region {region}"),
            ]
        })
        .collect()
}

/// `n` deterministic `ORDERS` rows with keys `1..=n`.
#[must_use]
pub fn orders_rows(n: usize) -> Vec<Vec<String>> {
    const STATUS: [&str; 3] = ["O", "F", "P"];
    const PRIORITY: [&str; 5] = ["1-URGENT", "2-HIGH", "3-MEDIUM", "4-NOT SPECIFIED", "5-LOW"];
    (1..=n)
        .map(|key| {
            vec![
                key.to_string(),
                (key * 7 % 1500 + 1).to_string(),
                STATUS[key % STATUS.len()].to_string(),
                format!("{}.{:02}", 1000 + key * 13, key % 100),
                format!("1995-{:02}-{:02}", key % 12 + 1, key % 28 + 1),
                PRIORITY[key % PRIORITY.len()].to_string(),
                format!("Clerk#{:09}", key % 1000),
                "0".to_string(),
                format!("order {key}"),
            ]
        })
        .collect()
}

/// `n` rows of `columns` fields each: `r{row}c{col}`, rows numbered from 1.
#[must_use]
pub fn synthetic_rows(n: usize, columns: usize) -> Vec<Vec<String>> {
    (1..=n)
        .map(|r| (1..=columns).map(|c| format!("r{r}c{c}")).collect())
        .collect()
}

/// Header of `columns` names `col1..colN`.
#[must_use]
pub fn synthetic_header(columns: usize) -> Vec<String> {
    (1..=columns).map(|c| format!("col{c}")).collect()
}
