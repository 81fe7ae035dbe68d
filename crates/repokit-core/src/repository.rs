//! The repository façade.

use std::{
    any::type_name,
    ops::Deref,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use repokit_db::{DbError, FromRow, Value};
use tracing::{debug, trace};

use crate::{
    boot::boot_scopes,
    builder::Builder,
    context::RepositoryContext,
    error::{RepositoryError, Result},
    identifier::{Identifier, Target},
    model::Model,
    payload::{Payload, PayloadSource},
    record::Record,
    resolver,
    scope::ScopeRegistry,
};

static SQL_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Declares a repository: its record type, payload allow-list, connection
/// and scopes.
///
/// Scopes are plain associated functions, so they can't reach repository
/// state.
pub trait Repository: Sized + Send + Sync + 'static {
    type Record: Record;

    /// Fields [`BaseRepository::payloads`] extracts. Empty falls back to
    /// [`Record::FILLABLE`].
    fn payload_fillable(&self) -> &[&str] {
        &[]
    }

    /// Connection to bind to instead of the context default.
    fn connection(&self) -> Option<&str> {
        None
    }

    /// Lists the scopes of this repository, usually with [`register_scopes!`](crate::register_scopes).
    fn register_scopes(_registry: &mut ScopeRegistry<Self::Record>) -> Result<()> {
        Ok(())
    }

    /// Runs once per repository type, on first construction.
    fn boot(ctx: &RepositoryContext) -> Result<()> {
        boot_scopes::<Self>(ctx)
    }
}

/// A repository bound to a [`RepositoryContext`].
///
/// Derefs to its [`Model`], so record-type operations that the repository
/// doesn't define itself are reachable directly.
pub struct BaseRepository<P: Repository> {
    ctx: Arc<RepositoryContext>,
    definition: P,
    connection: Option<String>,
    model: Model<P::Record>,
}

impl<P: Repository> BaseRepository<P> {
    /// Boots `P` if needed and binds the record type.
    pub fn new(ctx: &Arc<RepositoryContext>, definition: P) -> Result<Self> {
        ctx.boot_registry()
            .boot_if_not_booted::<P, _>(|| P::boot(ctx))?;

        let connection = definition.connection().map(str::to_string);
        let model = build_model::<P::Record>(ctx, connection.as_deref())?;

        Ok(Self {
            ctx: ctx.clone(),
            definition,
            connection,
            model,
        })
    }

    /// Builds a fresh record-type handle for the current connection.
    pub fn create_model(&self) -> Result<Model<P::Record>> {
        build_model::<P::Record>(&self.ctx, self.connection.as_deref())
    }

    pub fn model(&self) -> &Model<P::Record> {
        &self.model
    }

    pub fn definition(&self) -> &P {
        &self.definition
    }

    pub fn context(&self) -> &Arc<RepositoryContext> {
        &self.ctx
    }

    /// Rebinds the repository to the named connection.
    pub fn set_connection(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        let name = name.into();
        self.model = build_model::<P::Record>(&self.ctx, Some(&name))?;
        self.connection = Some(name);
        Ok(self)
    }

    /// Name of the connection the repository is bound to.
    pub fn connection(&self) -> &str {
        self.model.connection_name()
    }

    pub fn payload_fillable(&self) -> &[&str] {
        self.definition.payload_fillable()
    }

    /// Extracts the allow-listed fields from `source`.
    pub fn payloads<S: PayloadSource + ?Sized>(&self, source: &S) -> Payload {
        let fields = self.payload_fillable();
        if fields.is_empty() {
            source.only(P::Record::FILLABLE)
        } else {
            source.only(fields)
        }
    }

    /// Looks up a row by primary key, slug or external id.
    ///
    /// See [`resolver::find_by_identifier`].
    pub fn find_by_identifier<T: FromRow>(
        &self,
        identifier: impl Into<Identifier>,
        columns: &[&str],
        fail: bool,
    ) -> Result<Option<T>> {
        resolver::find_by_identifier::<P::Record, T>(&self.model, &identifier.into(), columns, fail)
    }

    /// Resolves `identifier` to a full record or fails with `NotFound`.
    pub fn find(&self, identifier: impl Into<Identifier>) -> Result<P::Record> {
        let identifier = identifier.into();
        resolver::find_by_identifier::<P::Record, P::Record>(&self.model, &identifier, &[], true)?
            .ok_or_else(|| RepositoryError::NotFound {
                table: P::Record::TABLE.to_string(),
                identifier: identifier.to_string(),
            })
    }

    pub fn find_optional(&self, identifier: impl Into<Identifier>) -> Result<Option<P::Record>> {
        self.find_by_identifier(identifier, &[], false)
    }

    fn resolve_target(&self, target: Target<P::Record>) -> Result<P::Record> {
        match target {
            // A held record is matched on its primary key only; its key may
            // equal another row's slug or external id.
            Target::Record(record) => {
                let key = record.key();
                self.model
                    .find_by_key(key)?
                    .ok_or_else(|| RepositoryError::NotFound {
                        table: P::Record::TABLE.to_string(),
                        identifier: key.to_string(),
                    })
            }
            Target::Identifier(identifier) => self.find(identifier),
        }
    }

    /// Creates a record from `source`, or updates `target` with it, inside
    /// one transaction. Returns the stored record.
    pub fn create_or_update<S: PayloadSource + ?Sized>(
        &self,
        source: &S,
        target: Option<Target<P::Record>>,
    ) -> Result<P::Record> {
        self.transaction(|| self.execute_create_or_update(source, target))
    }

    /// The body of [`BaseRepository::create_or_update`], without the transaction.
    pub fn execute_create_or_update<S: PayloadSource + ?Sized>(
        &self,
        source: &S,
        target: Option<Target<P::Record>>,
    ) -> Result<P::Record> {
        let payload = self.payloads(source);

        match target {
            Some(target) => {
                let record = self.resolve_target(target)?;
                trace!(repository = type_name::<P>(), key = record.key(), "updating");
                self.model.update(&record, &payload)
            }
            None => {
                trace!(repository = type_name::<P>(), "creating");
                self.model.create(&payload)
            }
        }
    }

    /// Resolves `target` and deletes it. Returns whether a row was removed.
    pub fn delete(&self, target: impl Into<Target<P::Record>>) -> Result<bool> {
        let record = self.resolve_target(target.into())?;
        self.model.delete(&record)
    }

    /// Runs `body` in a transaction on the bound connection.
    ///
    /// Commits when `body` returns `Ok`; rolls back and returns the error
    /// untouched otherwise. Nested calls use savepoints. Writes from other
    /// threads on the same connection wait until the transaction ends.
    pub fn transaction<T, E, F>(&self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<DbError>,
    {
        self.model.database().transaction(body)
    }

    pub fn query(&self) -> Builder<P::Record> {
        self.model.query()
    }

    /// Starts a query with the named scope applied.
    pub fn scope(&self, name: &str, args: &[Value]) -> Result<Builder<P::Record>> {
        self.query().scope(name, args)
    }
}

impl<P: Repository> Deref for BaseRepository<P> {
    type Target = Model<P::Record>;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}

fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if SQL_IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(RepositoryError::Configuration(format!(
            "{} `{}` is not a valid SQL identifier",
            kind, name
        )))
    }
}

fn build_model<R: Record>(ctx: &RepositoryContext, connection: Option<&str>) -> Result<Model<R>> {
    validate_identifier("table", R::TABLE)?;
    validate_identifier("primary key", R::PRIMARY_KEY)?;
    for column in [R::slug_key(), R::external_id_key()].into_iter().flatten() {
        validate_identifier("key column", column)?;
    }
    for column in R::FILLABLE {
        validate_identifier("fillable column", column)?;
    }

    let databases = ctx.databases();
    let name = connection.unwrap_or(databases.default_name());
    let db = databases.get(name).map_err(|err| {
        RepositoryError::Configuration(format!(
            "{} cannot bind to connection `{}`: {}",
            type_name::<R>(),
            name,
            err
        ))
    })?;

    debug!(record = type_name::<R>(), connection = %name, "bound record type");
    Ok(Model::new(db.clone(), name, ctx.scopes().clone()))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };

    use repokit_db::{define_entity, rusqlite::Row, Database, DatabaseManager, Expression as _};
    use serde_json::json;

    use super::*;
    use crate::{register_scopes, ScopePolicy};

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: i64,
        name: String,
        slug: Option<String>,
        uuid: Option<String>,
        email: Option<String>,
        active: bool,
    }

    impl FromRow for Widget {
        fn from_row(row: &Row) -> repokit_db::rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                slug: row.get("slug")?,
                uuid: row.get("uuid")?,
                email: row.get("email")?,
                active: row.get("active")?,
            })
        }
    }

    impl Record for Widget {
        const TABLE: &'static str = widgets::TABLE;
        const FILLABLE: &'static [&'static str] = &["name", "slug", "uuid", "email", "active"];

        fn key(&self) -> i64 {
            self.id
        }

        fn slug_key() -> Option<&'static str> {
            Some("slug")
        }

        fn external_id_key() -> Option<&'static str> {
            Some("uuid")
        }
    }

    #[derive(Debug)]
    struct WidgetName {
        name: String,
    }

    impl FromRow for WidgetName {
        fn from_row(row: &Row) -> repokit_db::rusqlite::Result<Self> {
            Ok(Self {
                name: row.get("name")?,
            })
        }
    }

    define_entity!(
        widgets {
            table: "widgets",
            columns: {
                ID: i64 => "id",
                NAME: String => "name",
                ACTIVE: bool => "active"
            }
        }
    );

    struct WidgetRepository;

    impl WidgetRepository {
        fn scope_active(query: &mut Builder<Widget>, _: &[Value]) -> Option<Builder<Widget>> {
            query.and_where(widgets::ACTIVE.eq(true));
            None
        }

        fn scope_named(query: &mut Builder<Widget>, args: &[Value]) -> Option<Builder<Widget>> {
            let name = args.first().cloned()?;
            Some(query.take().filter(widgets::NAME.eq(name)))
        }
    }

    impl Repository for WidgetRepository {
        type Record = Widget;

        fn register_scopes(registry: &mut ScopeRegistry<Widget>) -> Result<()> {
            register_scopes!(registry, WidgetRepository => [scope_active, scope_named])
        }
    }

    struct ContactRepository;

    impl Repository for ContactRepository {
        type Record = Widget;

        fn payload_fillable(&self) -> &[&str] {
            &["name", "email"]
        }
    }

    struct AdminWidgetRepository;

    impl Repository for AdminWidgetRepository {
        type Record = Widget;

        fn register_scopes(registry: &mut ScopeRegistry<Widget>) -> Result<()> {
            registry.add_scope("active", |query: &mut Builder<Widget>, _: &[Value]| {
                query.and_where(widgets::ID.gt(0_i64));
                None
            });
            Ok(())
        }
    }

    struct NameListRepository;

    impl Repository for NameListRepository {
        type Record = Widget;

        fn register_scopes(registry: &mut ScopeRegistry<Widget>) -> Result<()> {
            registry.add_scope("any_name", |query: &mut Builder<Widget>, args: &[Value]| {
                for (idx, name) in args.iter().enumerate() {
                    let matches = widgets::NAME.eq(name.clone());
                    if idx == 0 {
                        query.and_where(matches);
                    } else {
                        query.or_where(matches);
                    }
                }
                None
            });
            Ok(())
        }
    }

    struct DuplicateScopeRepository;

    impl Repository for DuplicateScopeRepository {
        type Record = Widget;

        fn register_scopes(registry: &mut ScopeRegistry<Widget>) -> Result<()> {
            registry.add_scope("recent", |_: &mut Builder<Widget>, _: &[Value]| None);
            registry.add_scope("recent", |_: &mut Builder<Widget>, _: &[Value]| None);
            Ok(())
        }
    }

    struct ReportsRepository;

    impl Repository for ReportsRepository {
        type Record = Widget;

        fn connection(&self) -> Option<&str> {
            Some("reports")
        }
    }

    static COUNTED_BOOTS: AtomicUsize = AtomicUsize::new(0);

    struct CountingRepository;

    impl CountingRepository {
        fn scope_counted(_: &mut Builder<Widget>, _: &[Value]) -> Option<Builder<Widget>> {
            None
        }
    }

    impl Repository for CountingRepository {
        type Record = Widget;

        fn register_scopes(registry: &mut ScopeRegistry<Widget>) -> Result<()> {
            register_scopes!(registry, CountingRepository => [scope_counted])
        }

        fn boot(ctx: &RepositoryContext) -> Result<()> {
            COUNTED_BOOTS.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            boot_scopes::<Self>(ctx)
        }
    }

    struct Broken {
        id: i64,
    }

    impl FromRow for Broken {
        fn from_row(row: &Row) -> repokit_db::rusqlite::Result<Self> {
            Ok(Self { id: row.get(0)? })
        }
    }

    impl Record for Broken {
        const TABLE: &'static str = "broken table";
        const FILLABLE: &'static [&'static str] = &[];

        fn key(&self) -> i64 {
            self.id
        }
    }

    struct BrokenRepository;

    impl Repository for BrokenRepository {
        type Record = Broken;
    }

    const SCHEMA: &str = "CREATE TABLE widgets (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT UNIQUE,
        uuid TEXT UNIQUE,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1
    )";

    const UNINDEXED_SCHEMA: &str = "CREATE TABLE widgets (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT,
        uuid TEXT,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1
    )";

    fn context_with(policy: ScopePolicy) -> Arc<RepositoryContext> {
        context_from(SCHEMA, policy)
    }

    fn context_from(schema: &str, policy: ScopePolicy) -> Arc<RepositoryContext> {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(schema).unwrap();

        let mut databases = DatabaseManager::new("default");
        databases.add("default", db);
        RepositoryContext::new(databases, policy).into_shared()
    }

    fn context() -> Arc<RepositoryContext> {
        context_with(ScopePolicy::Strict)
    }

    fn seed(ctx: &RepositoryContext) {
        ctx.databases()
            .default()
            .unwrap()
            .execute_batch(
                "INSERT INTO widgets (id, name, slug, uuid, active) VALUES
                    (7, 'Widget A', 'widget-a', 'a1b2', 1),
                    (9, 'Widget B', 'widget-b', 'c3d4', 0)",
            )
            .unwrap();
    }

    #[test]
    fn test_boot_once_installs_scopes_once() {
        let ctx = context();

        for _ in 0..3 {
            BaseRepository::new(&ctx, WidgetRepository).unwrap();
        }

        assert!(ctx.boot_registry().is_booted::<WidgetRepository>());
        assert_eq!(ctx.scopes().install_passes(), 1);
        assert_eq!(ctx.scopes().names::<Widget>(), vec!["active", "named"]);
    }

    #[test]
    fn test_concurrent_first_use_boots_once() {
        let ctx = context();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = ctx.clone();
                thread::spawn(move || BaseRepository::new(&ctx, CountingRepository).is_ok())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(COUNTED_BOOTS.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.scopes().install_passes(), 1);
        assert!(ctx.scopes().contains::<Widget>("counted"));
    }

    #[test]
    fn test_scopes_are_chainable() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        let active = repo.scope("active", &[]).unwrap().get().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 7);

        let named = repo
            .query()
            .scope("named", &[Value::Text("Widget B".into())])
            .unwrap()
            .first_or_fail()
            .unwrap();
        assert_eq!(named.id, 9);

        // no argument: the behavior declines and the untouched builder continues
        let all = repo.scope("named", &[]).unwrap().count().unwrap();
        assert_eq!(all, 2);

        let inactive_b = repo
            .scope("active", &[])
            .unwrap()
            .scope("named", &[Value::Text("Widget B".into())])
            .unwrap()
            .get()
            .unwrap();
        assert!(inactive_b.is_empty());

        assert!(matches!(
            repo.scope("archived", &[]),
            Err(RepositoryError::UnknownScope { name, .. }) if name == "archived"
        ));
    }

    #[test]
    fn test_find_by_identifier_strategies() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        assert_eq!(repo.find(7_i64).unwrap().id, 7);
        assert_eq!(repo.find("widget-a").unwrap().id, 7);
        assert_eq!(repo.find("a1b2").unwrap().id, 7);
        assert_eq!(repo.find("7abc").unwrap().id, 7);

        let missing = repo.find_by_identifier::<Widget>(8_i64, &["*"], true);
        assert!(matches!(
            missing,
            Err(RepositoryError::NotFound { table, identifier })
                if table == "widgets" && identifier == "8"
        ));
        assert!(repo
            .find_by_identifier::<Widget>(8_i64, &["*"], false)
            .unwrap()
            .is_none());
        assert!(repo.find_optional("nope").unwrap().is_none());
    }

    #[test]
    fn test_find_by_identifier_projection() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        let name = repo
            .find_by_identifier::<WidgetName>("widget-b", &["name"], true)
            .unwrap()
            .unwrap();
        assert_eq!(name.name, "Widget B");
    }

    #[test]
    fn test_create_then_update_in_place() {
        let ctx = context();
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        let created = repo
            .create_or_update(&json!({"name": "x", "id": 500, "other": "z"}), None)
            .unwrap();
        assert_eq!(created.name, "x");
        assert!(created.active);
        assert_ne!(created.id, 500);
        assert_eq!(repo.count().unwrap(), 1);

        let updated = repo
            .create_or_update(&json!({"name": "y"}), Some(Target::id(created.id)))
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "y");
        assert_eq!(repo.count().unwrap(), 1);

        let again = repo
            .create_or_update(
                &json!({"email": "y@example.com"}),
                Some(Target::record(updated.clone())),
            )
            .unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.name, "y");
        assert_eq!(again.email.as_deref(), Some("y@example.com"));
    }

    #[test]
    fn test_update_with_empty_payload_returns_record() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        let same = repo
            .create_or_update(&json!({"unknown": 1}), Some(Target::id("widget-a")))
            .unwrap();
        assert_eq!(same.name, "Widget A");
    }

    #[test]
    fn test_failed_upsert_rolls_back() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        let missing = repo.create_or_update(&json!({"name": "ghost"}), Some(Target::id(8_i64)));
        assert!(missing.unwrap_err().is_not_found());
        assert_eq!(repo.count().unwrap(), 2);

        let violated = repo.create_or_update(&json!({"name": null}), Some(Target::id(7_i64)));
        assert!(matches!(violated, Err(RepositoryError::Database(_))));
        assert_eq!(repo.find(7_i64).unwrap().name, "Widget A");
    }

    #[test]
    fn test_transaction_body_error_leaves_no_rows() {
        let ctx = context();
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        let result: Result<Widget> = repo.transaction(|| {
            let payload = repo.payloads(&json!({"name": "partial"}));
            repo.model().create(&payload)?;
            Err(RepositoryError::Custom("payment declined".into()))
        });

        match result {
            Err(RepositoryError::Custom(message)) => assert_eq!(message, "payment declined"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_delete_by_identifier_and_record() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        assert!(repo.delete("widget-a").unwrap());
        assert!(repo.find_optional(7_i64).unwrap().is_none());

        let b = repo.find("c3d4").unwrap();
        assert!(repo.delete(Target::record(b)).unwrap());
        assert_eq!(repo.count().unwrap(), 0);

        assert!(repo.delete(9_i64).unwrap_err().is_not_found());
    }

    #[test]
    fn test_scope_or_filters_stay_inside_the_scope() {
        let ctx = context();
        seed(&ctx);
        BaseRepository::new(&ctx, WidgetRepository).unwrap();
        let repo = BaseRepository::new(&ctx, NameListRepository).unwrap();

        let names = [Value::Text("Widget A".into()), Value::Text("Widget B".into())];
        let found = repo
            .scope("active", &[])
            .unwrap()
            .scope("any_name", &names)
            .unwrap()
            .get()
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 7);
        assert_eq!(repo.scope("any_name", &names).unwrap().count().unwrap(), 2);
    }

    #[test]
    fn test_record_target_ignores_colliding_slug() {
        let ctx = context_from(UNINDEXED_SCHEMA, ScopePolicy::Strict);
        ctx.databases()
            .default()
            .unwrap()
            .execute_batch(
                "INSERT INTO widgets (id, name, slug) VALUES
                    (3, 'three', '7'),
                    (7, 'seven', 'seven')",
            )
            .unwrap();
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();
        let seven = repo.find_by_key(7).unwrap().unwrap();

        let renamed = repo
            .create_or_update(&json!({"name": "renamed"}), Some(Target::record(seven)))
            .unwrap();
        assert_eq!(renamed.id, 7);
        assert_eq!(renamed.name, "renamed");
        assert_eq!(repo.find_by_key(3).unwrap().unwrap().name, "three");

        assert!(repo.delete(Target::record(renamed)).unwrap());
        assert!(repo.find_by_key(7).unwrap().is_none());
        assert!(repo.find_by_key(3).unwrap().is_some());
    }

    #[test]
    fn test_open_transaction_is_isolated_from_other_threads() {
        let ctx = context();
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();
        let (opened, wait_opened) = mpsc::channel();

        let abandoned = {
            let ctx = ctx.clone();
            thread::spawn(move || {
                let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();
                let result: Result<()> = repo.transaction(|| {
                    repo.create_or_update(&json!({"name": "a"}), None)?;
                    opened.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    Err(RepositoryError::Custom("abandoned".into()))
                });
                assert!(result.is_err());
            })
        };

        wait_opened.recv().unwrap();
        let b = repo.create_or_update(&json!({"name": "b"}), None).unwrap();
        abandoned.join().unwrap();

        let names: Vec<_> = repo.all().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["b".to_string()]);
        assert_eq!(repo.find_by_key(b.id).unwrap().unwrap().name, "b");
    }

    #[test]
    fn test_payload_allow_list_and_fallback() {
        let ctx = context();
        let source = json!({"name": "x", "email": "y", "other": "z"});

        let contacts = BaseRepository::new(&ctx, ContactRepository).unwrap();
        assert_eq!(
            serde_json::Value::Object(contacts.payloads(&source)),
            json!({"name": "x", "email": "y"})
        );

        let widgets = BaseRepository::new(&ctx, WidgetRepository).unwrap();
        assert!(widgets.payload_fillable().is_empty());
        let fallback = widgets.payloads(&json!({"name": "x", "active": false, "id": 3}));
        assert_eq!(fallback.len(), 2);
        assert!(fallback.contains_key("name"));
        assert!(fallback.contains_key("active"));
        assert!(!fallback.contains_key("id"));
    }

    #[test]
    fn test_duplicate_scope_in_one_repository_is_rejected() {
        let ctx = context();

        for _ in 0..2 {
            let result = BaseRepository::new(&ctx, DuplicateScopeRepository);
            assert!(matches!(
                result,
                Err(RepositoryError::DuplicateScope { name, .. }) if name == "recent"
            ));
        }
        assert!(!ctx.boot_registry().is_booted::<DuplicateScopeRepository>());
        assert_eq!(ctx.scopes().install_passes(), 0);
    }

    #[test]
    fn test_scope_clash_across_repositories_follows_policy() {
        let strict = context_with(ScopePolicy::Strict);
        BaseRepository::new(&strict, WidgetRepository).unwrap();
        assert!(matches!(
            BaseRepository::new(&strict, AdminWidgetRepository),
            Err(RepositoryError::DuplicateScope { name, .. }) if name == "active"
        ));

        let shadow = context_with(ScopePolicy::Shadow);
        seed(&shadow);
        let repo = BaseRepository::new(&shadow, WidgetRepository).unwrap();
        BaseRepository::new(&shadow, AdminWidgetRepository).unwrap();

        // the admin definition of `active` won
        assert_eq!(repo.scope("active", &[]).unwrap().count().unwrap(), 2);
    }

    #[test]
    fn test_connection_binding() {
        let ctx = context();
        assert!(matches!(
            BaseRepository::new(&ctx, ReportsRepository),
            Err(RepositoryError::Configuration(_))
        ));

        let reports = Database::open_in_memory().unwrap();
        reports.execute_batch(SCHEMA).unwrap();
        reports
            .execute_batch("INSERT INTO widgets (name) VALUES ('report')")
            .unwrap();

        let mut databases = DatabaseManager::new("default");
        databases.add("default", ctx.databases().default().unwrap().clone());
        databases.add("reports", reports);
        let ctx = RepositoryContext::new(databases, ScopePolicy::Strict).into_shared();

        let bound = BaseRepository::new(&ctx, ReportsRepository).unwrap();
        assert_eq!(bound.connection(), "reports");
        assert_eq!(bound.count().unwrap(), 1);

        let mut repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();
        assert_eq!(repo.connection(), "default");
        assert_eq!(repo.count().unwrap(), 0);

        repo.set_connection("reports").unwrap();
        assert_eq!(repo.connection(), "reports");
        assert_eq!(repo.all().unwrap()[0].name, "report");
        assert!(repo.set_connection("missing").is_err());
        assert_eq!(repo.connection(), "reports");

        let model = repo.create_model().unwrap();
        assert_eq!(model.connection_name(), "reports");
    }

    #[test]
    fn test_invalid_record_metadata_is_configuration_error() {
        let ctx = context();
        let result = BaseRepository::new(&ctx, BrokenRepository);
        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[test]
    fn test_forwarding_to_model() {
        let ctx = context();
        seed(&ctx);
        let repo = BaseRepository::new(&ctx, WidgetRepository).unwrap();

        assert_eq!(repo.count().unwrap(), 2);
        assert_eq!(repo.all().unwrap().len(), 2);
        assert_eq!(repo.find_by_key(9).unwrap().unwrap().name, "Widget B");
        assert_eq!(repo.table(), "widgets");
        assert_eq!(repo.fillable(), Widget::FILLABLE);
    }
}
