use crate::models::{Collection, ItemMap};

use super::view::{ItemRow, ViewRow};

/// Rows for `items` under the search `query`.
///
/// A blank query shows everything. Otherwise an item is shown when its name
/// or note contains the query, ignoring case; when nothing matches a single
/// placeholder quoting the query as typed is shown instead.
pub fn render_rows(collection: Collection, items: &ItemMap, query: &str) -> Vec<ViewRow> {
    if items.is_empty() {
        return vec![ViewRow::placeholder(collection.empty_message())];
    }

    let needle = query.trim().to_lowercase();
    let rows: Vec<ViewRow> = items
        .values()
        .filter(|item| {
            needle.is_empty()
                || item.name.to_lowercase().contains(&needle)
                || item.note.to_lowercase().contains(&needle)
        })
        .map(|item| ViewRow::Item(ItemRow::new(collection, item)))
        .collect();

    if rows.is_empty() {
        return vec![ViewRow::placeholder(collection.no_results_message(query))];
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, ItemStatus};
    use chrono::Utc;

    fn items(entries: &[(&str, &str, &str)]) -> ItemMap {
        entries
            .iter()
            .map(|(id, name, note)| {
                (
                    id.to_string(),
                    Item {
                        id: id.to_string(),
                        name: name.to_string(),
                        status: ItemStatus::Pending,
                        note: note.to_string(),
                        created_at: Utc::now(),
                    },
                )
            })
            .collect()
    }

    fn ids(rows: &[ViewRow]) -> Vec<String> {
        rows.iter().filter_map(ViewRow::as_item).map(|r| r.id.clone()).collect()
    }

    #[test]
    fn empty_collection_shows_placeholder() {
        let rows = render_rows(Collection::Goals, &ItemMap::new(), "");
        assert_eq!(rows, vec![ViewRow::placeholder("No goals yet. Add your first goal!")]);

        let rows = render_rows(Collection::Reminders, &ItemMap::new(), "milk");
        assert_eq!(
            rows,
            vec![ViewRow::placeholder("No reminders yet. Add your first reminder!")]
        );
    }

    #[test]
    fn blank_query_shows_everything_in_store_order() {
        let items = items(&[("b", "Swim", ""), ("a", "Run 5k", "")]);
        assert_eq!(ids(&render_rows(Collection::Goals, &items, "")), vec!["a", "b"]);
        assert_eq!(ids(&render_rows(Collection::Goals, &items, "   ")), vec!["a", "b"]);
    }

    #[test]
    fn query_matches_name_or_note_case_insensitively() {
        let items = items(&[
            ("a", "Run 5k", "morning only"),
            ("b", "Read BOOK", ""),
            ("c", "Swim", "evening"),
        ]);
        assert_eq!(ids(&render_rows(Collection::Goals, &items, "MORNING")), vec!["a"]);
        assert_eq!(ids(&render_rows(Collection::Goals, &items, "book")), vec!["b"]);
        assert_eq!(ids(&render_rows(Collection::Goals, &items, " n")), vec!["a", "c"]);
    }

    #[test]
    fn no_match_quotes_the_query() {
        let items = items(&[("a", "Run 5k", "")]);
        let rows = render_rows(Collection::Goals, &items, "Yoga");
        assert_eq!(rows, vec![ViewRow::placeholder("No results found for \"Yoga\"")]);
    }
}
