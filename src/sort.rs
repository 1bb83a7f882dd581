//! Deterministic ordering of the by-file and by-package listings.

use crate::config::{SortBy, SortOrder};
use crate::model::Entity;

/// Stable multi-key sort: the primary key comes from `sort_by`, the
/// direction applies to the primary key only, and ties always break by
/// entity name ascending. Percent keys compare with `f64::total_cmp` so
/// equal inputs produce identical orders on every run.
pub fn sort_entities<E: Entity>(entities: &mut [E], by: SortBy, order: SortOrder) {
    entities.sort_by(|a, b| {
        let primary = match by {
            SortBy::File => a.name().cmp(b.name()),
            SortBy::Statements => a.statement_hits().cmp(&b.statement_hits()),
            SortBy::Blocks => a.block_hits().cmp(&b.block_hits()),
            SortBy::StatementPercent => a.statement_pct().total_cmp(&b.statement_pct()),
            SortBy::BlockPercent => a.block_pct().total_cmp(&b.block_pct()),
        };
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.name().cmp(b.name()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Counter, FileStats};
    use crate::model::ByFile;

    fn entity(file: &str, statement_hits: u64, statement_total: u64) -> ByFile {
        ByFile::from_stats(
            &FileStats {
                file: file.to_string(),
                statements: Counter {
                    hits: statement_hits,
                    total: statement_total,
                },
                blocks: Counter {
                    hits: statement_hits,
                    total: statement_total,
                },
                uncovered: Vec::new(),
            },
            String::new(),
        )
    }

    fn names(entities: &[ByFile]) -> Vec<&str> {
        entities.iter().map(|e| e.file.as_str()).collect()
    }

    #[test]
    fn test_sort_by_file_ascending() {
        let mut entities = vec![entity("c.go", 1, 2), entity("a.go", 1, 2), entity("b.go", 1, 2)];
        sort_entities(&mut entities, SortBy::File, SortOrder::Asc);
        assert_eq!(names(&entities), vec!["a.go", "b.go", "c.go"]);
    }

    #[test]
    fn test_sort_by_statement_percent_desc() {
        let mut entities = vec![
            entity("a.go", 1, 2),  // 50%
            entity("b.go", 2, 2),  // 100%
            entity("c.go", 0, 2),  // 0%
        ];
        sort_entities(&mut entities, SortBy::StatementPercent, SortOrder::Desc);
        assert_eq!(names(&entities), vec!["b.go", "a.go", "c.go"]);
    }

    #[test]
    fn test_desc_keeps_name_tiebreak_ascending() {
        let mut entities = vec![entity("b.go", 1, 2), entity("a.go", 1, 2), entity("c.go", 4, 4)];
        sort_entities(&mut entities, SortBy::StatementPercent, SortOrder::Desc);
        // c first (100%), then the two 50% files by name ascending.
        assert_eq!(names(&entities), vec!["c.go", "a.go", "b.go"]);
    }

    #[test]
    fn test_sort_by_hit_counts() {
        let mut entities = vec![entity("a.go", 5, 10), entity("b.go", 2, 10), entity("c.go", 9, 10)];
        sort_entities(&mut entities, SortBy::Statements, SortOrder::Asc);
        assert_eq!(names(&entities), vec!["b.go", "a.go", "c.go"]);
        sort_entities(&mut entities, SortBy::Blocks, SortOrder::Desc);
        assert_eq!(names(&entities), vec!["c.go", "a.go", "b.go"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut entities = vec![
            entity("b.go", 1, 2),
            entity("a.go", 1, 2),
            entity("d.go", 3, 4),
            entity("c.go", 0, 4),
        ];
        sort_entities(&mut entities, SortBy::BlockPercent, SortOrder::Desc);
        let once = names(&entities).join(",");
        sort_entities(&mut entities, SortBy::BlockPercent, SortOrder::Desc);
        assert_eq!(names(&entities).join(","), once);
    }
}
