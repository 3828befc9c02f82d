use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{
    client, client_department, department, id_sequence, legal_entity, legal_entity_department,
};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    if config.is_sqlite() {
        info!("Opening sqlite database: {}", config.path.display());
    } else {
        info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);
    }

    let mut opt = ConnectOptions::new(&database_url);
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    if config.is_sqlite() {
        // sqlite has a single writer and ":memory:" lives on one connection
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(100)
            .min_connections(5)
            .idle_timeout(Duration::from_secs(8))
            .max_lifetime(Duration::from_secs(8))
            .set_schema_search_path("public");
    }

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Throwaway in-memory database with the schema applied
pub async fn init_memory_database() -> Result<DatabaseConnection, DbErr> {
    let config = DatabaseConfig {
        db_type: "sqlite".to_string(),
        path: ":memory:".into(),
        ..Default::default()
    };
    init_database(&config).await
}

/// Auto-migrate database tables
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    create_table_if_not_exists(db, backend, schema.create_table_from_entity(id_sequence::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(department::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(client::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(client_department::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(legal_entity::Entity)).await?;
    create_table_if_not_exists(
        db,
        backend,
        schema.create_table_from_entity(legal_entity_department::Entity),
    )
    .await?;

    // Range scans are always bounded by tree_id then lft
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_dept_department_tree_lft")
            .table(department::Entity)
            .col(department::Column::TreeId)
            .col(department::Column::Lft)
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_dept_department_parent")
            .table(department::Entity)
            .col(department::Column::ParentId)
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_dept_client_department_pair")
            .table(client_department::Entity)
            .col(client_department::Column::DepartmentId)
            .col(client_department::Column::ClientId)
            .to_owned(),
    )
    .await?;
    create_index_if_not_exists(
        db,
        backend,
        Index::create()
            .name("idx_dept_legal_entity_department_pair")
            .table(legal_entity_department::Entity)
            .col(legal_entity_department::Column::DepartmentId)
            .col(legal_entity_department::Column::LegalEntityId)
            .to_owned(),
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Create an index if it doesn't exist
async fn create_index_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
