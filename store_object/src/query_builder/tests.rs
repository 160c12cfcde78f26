//! Query builder and SQL rendering tests

#[cfg(test)]
mod tests {
    use crate::query_builder::{
        Condition, Expr, GroupBy, JoinClause, JoinType, Page, QueryBuilder, SelectField, SortOrder,
        SqlGenerator, UpdateSet, UpsertClause,
    };
    use crate::record::Record;
    use crate::schema::{Column, Schema};
    use crate::statement::{
        DeleteStatement, InsertStatement, OnConflict, SelectStatement, Statement, UpdateStatement,
    };
    use std::sync::Arc;
    use type_mapping::{Domain, StoreValue};

    fn movies() -> Arc<Schema> {
        Arc::new(
            Schema::define(
                "movies",
                vec![
                    Column::new("id", Domain::Integer).auto_increment(),
                    Column::new("title", Domain::Varchar(100)),
                    Column::new("genre", Domain::Varchar(100)),
                    Column::new("description", Domain::Text).nullable(),
                    Column::new("duration_in_minutes", Domain::Integer),
                    Column::new("tags", Domain::array(Domain::Varchar(70))),
                ],
                "id",
            )
            .unwrap(),
        )
    }

    fn authors() -> Arc<Schema> {
        Arc::new(
            Schema::define(
                "authors",
                vec![
                    Column::new("id", Domain::Integer).auto_increment(),
                    Column::new("name", Domain::Varchar(100)),
                ],
                "id",
            )
            .unwrap(),
        )
    }

    fn books() -> Arc<Schema> {
        Arc::new(
            Schema::define(
                "books",
                vec![
                    Column::new("id", Domain::Integer).auto_increment(),
                    Column::new("title", Domain::Varchar(100)),
                    Column::new("author_id", Domain::Integer)
                        .nullable()
                        .references("authors", "id"),
                ],
                "id",
            )
            .unwrap(),
        )
    }

    fn render_select(schema: Arc<Schema>, joins: Vec<JoinClause>, query: &QueryBuilder) -> (String, Vec<StoreValue>) {
        let select = SelectStatement::bind(schema, joins, query).unwrap();
        let rendered = SqlGenerator::render(&Statement::Select(select)).unwrap();
        (rendered.sql, rendered.params)
    }

    // ========================================
    // Conditional composition
    // ========================================

    #[test]
    fn test_builder_combines_left_to_right() {
        let a = Condition::eq("genre", "Action");
        let b = Condition::less("duration_in_minutes", 120);
        let c = Condition::is_not_null("description");

        let query = QueryBuilder::new()
            .and_where(a.clone())
            .or_where(b.clone())
            .and_where(c.clone());
        assert_eq!(query.condition(), a.or(b).and(c));
    }

    #[test]
    fn test_first_predicate_installed_as_is() {
        let a = Condition::eq("genre", "Action");
        assert_eq!(QueryBuilder::new().or_where(a.clone()).condition(), a);
        assert_eq!(QueryBuilder::new().and_where(a.clone()).condition(), a);
        assert_eq!(QueryBuilder::new().condition(), Condition::All);
    }

    #[test]
    fn test_optional_filters() {
        let genre = Some(Condition::eq("genre", "Action"));
        let short = Some(Condition::less("duration_in_minutes", 120));

        let both = QueryBuilder::new()
            .and_where_if(genre.clone())
            .and_where_if(short.clone());
        assert_eq!(
            both.condition(),
            Condition::eq("genre", "Action").and(Condition::less("duration_in_minutes", 120))
        );

        // mixing in or_where_if widens the filter
        let widened = QueryBuilder::new().and_where_if(genre).or_where_if(short);
        assert_eq!(
            widened.condition(),
            Condition::eq("genre", "Action").or(Condition::less("duration_in_minutes", 120))
        );

        let only_short = QueryBuilder::new()
            .and_where_if(None)
            .and_where_if(Some(Condition::less("duration_in_minutes", 120)));
        assert_eq!(only_short.condition(), Condition::less("duration_in_minutes", 120));
    }

    // ========================================
    // SELECT rendering
    // ========================================

    #[test]
    fn test_select_with_filter_and_page() {
        let query = QueryBuilder::new()
            .filter(Condition::eq("genre", "Action"))
            .and_where(Condition::less("duration_in_minutes", 120))
            .order_by("id", SortOrder::Asc)
            .page(Page::new(1, 10).unwrap());
        let (sql, params) = render_select(movies(), Vec::new(), &query);

        assert_eq!(
            sql,
            "SELECT \"id\" AS \"id\", \"title\" AS \"title\", \"genre\" AS \"genre\", \
             \"description\" AS \"description\", \"duration_in_minutes\" AS \"duration_in_minutes\", \
             \"tags\"::text AS \"tags\" FROM \"movies\" \
             WHERE (\"genre\" = $1::varchar AND \"duration_in_minutes\" < $2::integer) \
             ORDER BY \"id\" ASC LIMIT 10 OFFSET 0"
        );
        assert_eq!(params, vec![StoreValue::from("Action"), StoreValue::Integer(120)]);
    }

    #[test]
    fn test_select_operators() {
        let cases = [
            (Condition::like("title", "The%"), "\"title\" LIKE $1::text"),
            (Condition::not_like("title", "The%"), "\"title\" NOT LIKE $1::text"),
            (Condition::regex_match("title", "^[A-M]"), "\"title\" ~ $1::text"),
            (
                Condition::between("duration_in_minutes", 90, 120),
                "\"duration_in_minutes\" BETWEEN $1::integer AND $2::integer",
            ),
            (
                Condition::in_list("genre", vec!["Action", "Drama"]),
                "\"genre\" IN ($1::varchar, $2::varchar)",
            ),
            (Condition::neq("genre", "Action"), "\"genre\" <> $1::varchar"),
            (Condition::is_null("description"), "\"description\" IS NULL"),
            (
                Condition::in_list("genre", Vec::<String>::new()),
                "1=0",
            ),
            (
                Condition::not_in_list("genre", Vec::<String>::new()),
                "1=1",
            ),
        ];

        for (condition, expected) in cases {
            let query = QueryBuilder::new()
                .select(vec![SelectField::field("id")])
                .filter(condition);
            let (sql, _) = render_select(movies(), Vec::new(), &query);
            assert_eq!(
                sql,
                format!("SELECT \"id\" AS \"id\" FROM \"movies\" WHERE {}", expected)
            );
        }
    }

    #[test]
    fn test_select_grouped_counts() {
        let query = QueryBuilder::new()
            .select(vec![SelectField::field("genre"), SelectField::count_all()])
            .group_by(GroupBy::single("genre"))
            .order_by("count", SortOrder::Desc)
            .order_by("genre", SortOrder::Asc);
        let (sql, params) = render_select(movies(), Vec::new(), &query);
        assert_eq!(
            sql,
            "SELECT \"genre\" AS \"genre\", COUNT(*) AS \"count\" FROM \"movies\" \
             GROUP BY \"genre\" ORDER BY \"count\" DESC, \"genre\" ASC"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_having_uses_aggregate_expression() {
        let query = QueryBuilder::new()
            .select(vec![SelectField::field("genre"), SelectField::count_all()])
            .group_by(GroupBy::single("genre").having(Condition::greater("count", 1)));
        let (sql, params) = render_select(movies(), Vec::new(), &query);
        assert_eq!(
            sql,
            "SELECT \"genre\" AS \"genre\", COUNT(*) AS \"count\" FROM \"movies\" \
             GROUP BY \"genre\" HAVING COUNT(*) > $1::bigint"
        );
        assert_eq!(params, vec![StoreValue::Integer(1)]);
    }

    #[test]
    fn test_select_aggregates() {
        let query = QueryBuilder::new().select(vec![
            SelectField::sum("duration_in_minutes"),
            SelectField::avg("duration_in_minutes"),
            SelectField::max("title"),
            SelectField::count_distinct("genre").with_alias("genres"),
        ]);
        let (sql, _) = render_select(movies(), Vec::new(), &query);
        assert_eq!(
            sql,
            "SELECT SUM(\"duration_in_minutes\")::double precision AS \"sum_duration_in_minutes\", \
             AVG(\"duration_in_minutes\")::double precision AS \"avg_duration_in_minutes\", \
             MAX(\"title\") AS \"max_title\", COUNT(DISTINCT \"genre\") AS \"genres\" FROM \"movies\""
        );
    }

    #[test]
    fn test_select_joined_tables() {
        let join = JoinClause::from_relation(JoinType::Inner, &books(), authors()).unwrap();
        let query = QueryBuilder::new()
            .filter(Condition::eq("name", "Author1"))
            .order_by("title", SortOrder::Asc);
        let (sql, params) = render_select(books(), vec![join], &query);
        assert_eq!(
            sql,
            "SELECT \"books\".\"id\" AS \"books.id\", \"books\".\"title\" AS \"books.title\", \
             \"books\".\"author_id\" AS \"books.author_id\", \"authors\".\"id\" AS \"authors.id\", \
             \"authors\".\"name\" AS \"authors.name\" FROM \"books\" \
             INNER JOIN \"authors\" ON \"books\".\"author_id\" = \"authors\".\"id\" \
             WHERE \"authors\".\"name\" = $1::varchar ORDER BY \"books.title\" ASC"
        );
        assert_eq!(params, vec![StoreValue::from("Author1")]);
    }

    #[test]
    fn test_select_cross_join() {
        let query = QueryBuilder::new().select(vec![
            SelectField::field("books.title"),
            SelectField::field("authors.name"),
        ]);
        let (sql, _) = render_select(books(), vec![JoinClause::cross(authors())], &query);
        assert_eq!(
            sql,
            "SELECT \"books\".\"title\" AS \"books.title\", \"authors\".\"name\" AS \"authors.name\" \
             FROM \"books\" CROSS JOIN \"authors\""
        );
    }

    // ========================================
    // Write rendering
    // ========================================

    fn movie(id: Option<i32>) -> Record {
        let mut record = Record::new()
            .with("title", "Inception")
            .with("genre", "Sci-Fi")
            .with("duration_in_minutes", 148)
            .with("tags", vec!["dreams"]);
        if let Some(id) = id {
            record.insert("id", id);
        }
        record
    }

    #[test]
    fn test_insert_ignore_returning_generated_key() {
        let insert = InsertStatement::bind(movies(), &[movie(None)], OnConflict::Ignore, true).unwrap();
        let rendered = SqlGenerator::render(&Statement::Insert(insert)).unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO \"movies\" (\"id\", \"title\", \"genre\", \"description\", \
             \"duration_in_minutes\", \"tags\") \
             VALUES (DEFAULT, $1::varchar, $2::varchar, $3::text, $4::integer, $5::varchar[]) \
             ON CONFLICT (\"id\") DO NOTHING RETURNING \"id\" AS \"id\""
        );
        assert_eq!(rendered.params[2], StoreValue::Null);
        assert_eq!(rendered.params[4], StoreValue::from("{dreams}"));
    }

    #[test]
    fn test_upsert_merge_clause() {
        let clause = UpsertClause::new()
            .set("description", Expr::value("Updated"))
            .set(
                "genre",
                Expr::concat(vec![
                    Expr::incoming("genre"),
                    Expr::value(" | "),
                    Expr::existing("genre"),
                ]),
            )
            .set(
                "duration_in_minutes",
                Expr::existing("duration_in_minutes").add(Expr::value(10)),
            )
            .exclude("tags")
            .guard(Condition::eq("id", 1));
        let insert =
            InsertStatement::bind(movies(), &[movie(Some(1))], OnConflict::Update(clause), false).unwrap();
        let rendered = SqlGenerator::render(&Statement::Insert(insert)).unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO \"movies\" (\"id\", \"title\", \"genre\", \"description\", \
             \"duration_in_minutes\", \"tags\") \
             VALUES ($1::integer, $2::varchar, $3::varchar, $4::text, $5::integer, $6::varchar[]) \
             ON CONFLICT (\"id\") DO UPDATE SET \"title\" = EXCLUDED.\"title\", \
             \"genre\" = (EXCLUDED.\"genre\" || $7::varchar || \"movies\".\"genre\"), \
             \"description\" = $8::text, \
             \"duration_in_minutes\" = (\"movies\".\"duration_in_minutes\" + $9::integer) \
             WHERE \"movies\".\"id\" = $10::integer"
        );
        assert_eq!(rendered.params.len(), 10);
        assert!(rendered.shape.is_none());
    }

    #[test]
    fn test_upsert_with_everything_excluded_does_nothing() {
        let mut clause = UpsertClause::new();
        for column in ["title", "genre", "description", "duration_in_minutes", "tags"] {
            clause = clause.exclude(column);
        }
        let insert =
            InsertStatement::bind(movies(), &[movie(Some(1))], OnConflict::Update(clause), false).unwrap();
        let rendered = SqlGenerator::render(&Statement::Insert(insert)).unwrap();
        assert!(rendered.sql.ends_with("ON CONFLICT (\"id\") DO NOTHING"));
    }

    #[test]
    fn test_update_and_delete() {
        let set = UpdateSet::new().increment("duration_in_minutes", 10);
        let update =
            UpdateStatement::bind(movies(), &set.assignments(), &Condition::eq("genre", "Action")).unwrap();
        let rendered = SqlGenerator::render(&Statement::Update(update)).unwrap();
        assert_eq!(
            rendered.sql,
            "UPDATE \"movies\" SET \"duration_in_minutes\" = \
             (\"movies\".\"duration_in_minutes\" + $1::integer) WHERE \"genre\" = $2::varchar"
        );

        let delete = DeleteStatement::bind(movies(), &Condition::all()).unwrap();
        let rendered = SqlGenerator::render(&Statement::Delete(delete)).unwrap();
        assert_eq!(rendered.sql, "DELETE FROM \"movies\"");
    }

    #[test]
    fn test_create_table_passthrough() {
        let rendered = SqlGenerator::render(&Statement::CreateTable(authors())).unwrap();
        assert_eq!(
            rendered.sql,
            "CREATE TABLE IF NOT EXISTS \"authors\" (\"id\" SERIAL PRIMARY KEY, \"name\" VARCHAR(100) NOT NULL)"
        );
        assert!(rendered.params.is_empty());
    }
}
