//! SQL dialect differences the query builder must account for
//!
//! SQLite and MySQL both use `?` positional placeholders; PostgreSQL (and
//! the "Prisma" wire-compatible dialect layered on top of it) uses `$N`
//! and additionally supports a `RETURNING` clause on writes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
    Postgres,
    Prisma,
}

impl Dialect {
    /// The placeholder token for the `index`-th (1-based) bound parameter.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
            Dialect::Postgres | Dialect::Prisma => format!("${index}"),
        }
    }

    /// Whether writes should append `RETURNING *` to hand back the row in
    /// one round trip instead of a separate `SELECT`.
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Prisma)
    }

    /// Quote an identifier (table or column name) for this dialect. Every
    /// supported dialect accepts ANSI double quotes.
    pub fn quote_ident(self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_and_mysql_use_bare_question_marks() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Mysql.placeholder(1), "?");
    }

    #[test]
    fn postgres_and_prisma_use_numbered_dollar_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(2), "$2");
        assert_eq!(Dialect::Prisma.placeholder(5), "$5");
    }

    #[test]
    fn only_postgres_family_supports_returning() {
        assert!(Dialect::Postgres.supports_returning());
        assert!(Dialect::Prisma.supports_returning());
        assert!(!Dialect::Sqlite.supports_returning());
        assert!(!Dialect::Mysql.supports_returning());
    }
}
