// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use dossier_api::db::{establish_connection_with_config, DbConfig};
use dossier_api::entities::{category, client, contact, entity, participant, product};
use dossier_api::events::{self, Event};
use dossier_api::migrator::Migrator;
use dossier_api::DossierServices;

/// Helper harness wiring the full service bundle over a fresh in-memory
/// SQLite database.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub services: DossierServices,
    pub events: mpsc::Receiver<Event>,
}

impl TestContext {
    /// Construct a new context with migrated, empty state.
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            // A single connection keeps every statement on the same
            // in-memory database.
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = establish_connection_with_config(&config)
            .await
            .expect("failed to open in-memory database");
        Migrator::up(&pool, None)
            .await
            .expect("failed to run migrations in tests");

        let (sender, events) = events::channel(64);
        let db = Arc::new(pool);
        let services = DossierServices::build(db.clone(), sender);

        Self {
            db,
            services,
            events,
        }
    }

    pub async fn seed_entity(&self, code: &str) -> entity::Model {
        entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Entity {code}")),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed entity")
    }

    pub async fn seed_client(&self, c_num: &str, name: &str) -> client::Model {
        client::ActiveModel {
            id: Set(Uuid::new_v4()),
            c_num: Set(c_num.to_string()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed client")
    }

    pub async fn seed_contact(&self, client: &client::Model, name: &str) -> contact::Model {
        contact::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(client.id),
            name: Set(name.to_string()),
            email: Set(Some(format!(
                "{}@client.example",
                name.to_lowercase().replace(' ', ".")
            ))),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed contact")
    }

    pub async fn seed_category(&self, entity: &entity::Model, code: &str) -> category::Model {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Category {code}")),
            entity_id: Set(entity.id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed category")
    }

    pub async fn seed_product(&self, category: &category::Model, code: &str) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Product {code}")),
            category_id: Set(category.id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed product")
    }

    pub async fn seed_participant(
        &self,
        formation_id: Uuid,
        last_name: &str,
        first_name: &str,
    ) -> participant::Model {
        participant::ActiveModel {
            id: Set(Uuid::new_v4()),
            last_name: Set(last_name.to_string()),
            first_name: Set(first_name.to_string()),
            email: Set(None),
            phone: Set(None),
            function: Set(None),
            formation_id: Set(formation_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed participant")
    }
}

/// Standard fixture: entity KIP, one client with a contact, a services
/// category and a training category with one product each.
pub struct Fixture {
    pub entity: entity::Model,
    pub client: client::Model,
    pub contact: contact::Model,
    pub standard_product: product::Model,
    pub training_product: product::Model,
}

pub async fn seed_fixture(ctx: &TestContext) -> Fixture {
    let entity = ctx.seed_entity("KIP").await;
    let client = ctx.seed_client("C001", "Acme Industrie").await;
    let contact = ctx.seed_contact(&client, "Jean Martin").await;
    let standard = ctx.seed_category(&entity, "INS").await;
    let training = ctx.seed_category(&entity, "FOR").await;
    let standard_product = ctx.seed_product(&standard, "VTE1").await;
    let training_product = ctx.seed_product(&training, "VTE2").await;

    Fixture {
        entity,
        client,
        contact,
        standard_product,
        training_product,
    }
}
