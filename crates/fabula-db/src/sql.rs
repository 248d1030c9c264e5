//! Transaction body shared by the `PostgreSQL` and `SQLite` stores.
//!
//! Every statement goes through [`sqlx::QueryBuilder`], which renders the
//! placeholder syntax of its database, so the SQL text below is valid for
//! both dialects. [`sql_transaction!`] stamps the implementation out once
//! per concrete database type.
//!
//! Table names are interpolated from [`Table::name`](fabula_core::store::Table::name),
//! a closed set; every value is a bound parameter.

/// Columns of every entity table, in select order.
pub(crate) const DOCUMENT_COLUMNS: &str =
    "id, tenant_id, scope_id, parent_id, ref_id, sort_key, body, created_at, updated_at";

/// Columns of `entity_relations`, in select order.
pub(crate) const RELATION_COLUMNS: &str = "id, tenant_id, world_id, source_type, source_id, \
     target_type, target_id, relation_type, context_type, context_id, attributes, summary, \
     mirror_id, created_by_user_id, created_at, updated_at";

/// Order of entity rows: `sort_key` with nulls last, then creation.
pub(crate) const DOCUMENT_ORDER: &str = " ORDER BY sort_key ASC NULLS LAST, created_at ASC, id ASC";

/// Implements [`Transaction`](fabula_core::store::Transaction) for a
/// wrapper around `sqlx::Transaction<'static, $db>`.
macro_rules! sql_transaction {
    ($(#[$meta:meta])* $name:ident, $db:ty) => {
        $(#[$meta])*
        pub(crate) struct $name {
            tx: ::sqlx::Transaction<'static, $db>,
        }

        impl $name {
            pub(crate) const fn new(tx: ::sqlx::Transaction<'static, $db>) -> Self {
                Self { tx }
            }
        }

        type DbRow = <$db as ::sqlx::Database>::Row;

        fn col<'r, T>(row: &'r DbRow, name: &str) -> Result<T, ::fabula_core::StoreError>
        where
            T: ::sqlx::Decode<'r, $db> + ::sqlx::Type<$db>,
        {
            ::sqlx::Row::try_get(row, name).map_err($crate::error::store_error)
        }

        fn document(
            row: &DbRow,
        ) -> Result<::fabula_core::store::Document, ::fabula_core::StoreError> {
            let body: ::sqlx::types::Json<::serde_json::Value> = col(row, "body")?;
            Ok(::fabula_core::store::Document {
                id: col(row, "id")?,
                tenant_id: ::fabula_types::TenantId(col(row, "tenant_id")?),
                scope_id: col(row, "scope_id")?,
                parent_id: col(row, "parent_id")?,
                ref_id: col(row, "ref_id")?,
                sort_key: col(row, "sort_key")?,
                body: body.0,
                created_at: col(row, "created_at")?,
                updated_at: col(row, "updated_at")?,
            })
        }

        fn entity_kind(
            row: &DbRow,
            column: &str,
        ) -> Result<::fabula_types::EntityKind, ::fabula_core::StoreError> {
            let text: String = col(row, column)?;
            text.parse()
                .map_err(|e| $crate::error::bad_column(column, e))
        }

        fn relation(
            row: &DbRow,
        ) -> Result<::fabula_types::EntityRelation, ::fabula_core::StoreError> {
            let attributes: ::sqlx::types::Json<
                ::std::collections::BTreeMap<String, ::serde_json::Value>,
            > = col(row, "attributes")?;
            let mirror_id: Option<::uuid::Uuid> = col(row, "mirror_id")?;
            let created_by: Option<::uuid::Uuid> = col(row, "created_by_user_id")?;
            Ok(::fabula_types::EntityRelation {
                id: ::fabula_types::RelationId(col(row, "id")?),
                tenant_id: ::fabula_types::TenantId(col(row, "tenant_id")?),
                world_id: ::fabula_types::WorldId(col(row, "world_id")?),
                source_type: entity_kind(row, "source_type")?,
                source_id: col(row, "source_id")?,
                target_type: entity_kind(row, "target_type")?,
                target_id: col(row, "target_id")?,
                relation_type: col(row, "relation_type")?,
                context_type: col(row, "context_type")?,
                context_id: col(row, "context_id")?,
                attributes: attributes.0,
                summary: col(row, "summary")?,
                mirror_id: mirror_id.map(::fabula_types::RelationId),
                created_by_user_id: created_by.map(::fabula_types::UserId),
                created_at: col(row, "created_at")?,
                updated_at: col(row, "updated_at")?,
            })
        }

        fn push_filter(
            qb: &mut ::sqlx::QueryBuilder<'_, $db>,
            tenant: ::fabula_types::TenantId,
            filter: ::fabula_core::store::Filter,
        ) {
            qb.push(" WHERE tenant_id = ").push_bind(tenant.into_inner());
            if let Some(scope) = filter.scope_id {
                qb.push(" AND scope_id = ").push_bind(scope);
            }
            match filter.parent {
                ::fabula_core::store::ParentFilter::Any => {}
                ::fabula_core::store::ParentFilter::Root => {
                    qb.push(" AND parent_id IS NULL");
                }
                ::fabula_core::store::ParentFilter::Of(parent) => {
                    qb.push(" AND parent_id = ").push_bind(parent);
                }
            }
            if let Some(reference) = filter.ref_id {
                qb.push(" AND ref_id = ").push_bind(reference);
            }
        }

        fn push_relation_query<'q>(
            qb: &mut ::sqlx::QueryBuilder<'q, $db>,
            tenant: ::fabula_types::TenantId,
            query: &'q ::fabula_core::store::RelationQuery,
        ) {
            use ::fabula_core::store::{RelationEndpoint, SortDirection};

            qb.push(" WHERE tenant_id = ").push_bind(tenant.into_inner());
            let far = match query.endpoint {
                RelationEndpoint::Source(kind, id) => {
                    qb.push(" AND source_type = ").push_bind(kind.as_str());
                    qb.push(" AND source_id = ").push_bind(id);
                    Some("target")
                }
                RelationEndpoint::Target(kind, id) => {
                    qb.push(" AND target_type = ").push_bind(kind.as_str());
                    qb.push(" AND target_id = ").push_bind(id);
                    Some("source")
                }
                RelationEndpoint::World(world) => {
                    qb.push(" AND world_id = ").push_bind(world.into_inner());
                    None
                }
            };
            if let (Some(far), Some((kind, id))) = (far, query.counterpart) {
                qb.push(format!(" AND {far}_type = ")).push_bind(kind.as_str());
                qb.push(format!(" AND {far}_id = ")).push_bind(id);
            }
            if let Some(label) = query.relation_type.as_deref() {
                qb.push(" AND relation_type = ").push_bind(label);
            }
            if query.exclude_mirrors {
                qb.push(" AND (mirror_id IS NULL OR id < mirror_id)");
            }
            let (op, order) = match query.direction {
                SortDirection::Asc => (">", " ORDER BY created_at ASC, id ASC"),
                SortDirection::Desc => ("<", " ORDER BY created_at DESC, id DESC"),
            };
            if let Some(after) = query.after {
                qb.push(format!(" AND (created_at, id) {op} ("))
                    .push_bind(after.created_at)
                    .push(", ")
                    .push_bind(after.id.into_inner())
                    .push(")");
            }
            qb.push(order);
            if let Some(limit) = query.limit {
                qb.push(" LIMIT ").push_bind(i64::from(limit));
            }
        }

        #[::async_trait::async_trait]
        impl ::fabula_core::store::Transaction for $name {
            async fn get(
                &mut self,
                table: ::fabula_core::store::Table,
                tenant: ::fabula_types::TenantId,
                id: ::uuid::Uuid,
            ) -> Result<Option<::fabula_core::store::Document>, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!(
                    "SELECT {} FROM {table}",
                    $crate::sql::DOCUMENT_COLUMNS
                ));
                qb.push(" WHERE tenant_id = ")
                    .push_bind(tenant.into_inner())
                    .push(" AND id = ")
                    .push_bind(id);
                let row = qb
                    .build()
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                row.as_ref().map(document).transpose()
            }

            async fn list(
                &mut self,
                table: ::fabula_core::store::Table,
                tenant: ::fabula_types::TenantId,
                filter: ::fabula_core::store::Filter,
            ) -> Result<Vec<::fabula_core::store::Document>, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!(
                    "SELECT {} FROM {table}",
                    $crate::sql::DOCUMENT_COLUMNS
                ));
                push_filter(&mut qb, tenant, filter);
                qb.push($crate::sql::DOCUMENT_ORDER);
                let rows = qb
                    .build()
                    .fetch_all(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                rows.iter().map(document).collect()
            }

            async fn insert(
                &mut self,
                table: ::fabula_core::store::Table,
                doc: &::fabula_core::store::Document,
            ) -> Result<(), ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!(
                    "INSERT INTO {table} ({}) VALUES (",
                    $crate::sql::DOCUMENT_COLUMNS
                ));
                qb.separated(", ")
                    .push_bind(doc.id)
                    .push_bind(doc.tenant_id.into_inner())
                    .push_bind(doc.scope_id)
                    .push_bind(doc.parent_id)
                    .push_bind(doc.ref_id)
                    .push_bind(doc.sort_key)
                    .push_bind(::sqlx::types::Json(&doc.body))
                    .push_bind(doc.created_at)
                    .push_bind(doc.updated_at);
                qb.push(")");
                qb.build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(())
            }

            async fn update(
                &mut self,
                table: ::fabula_core::store::Table,
                doc: &::fabula_core::store::Document,
            ) -> Result<bool, ::fabula_core::StoreError> {
                let mut qb =
                    ::sqlx::QueryBuilder::<$db>::new(format!("UPDATE {table} SET scope_id = "));
                qb.push_bind(doc.scope_id)
                    .push(", parent_id = ")
                    .push_bind(doc.parent_id)
                    .push(", ref_id = ")
                    .push_bind(doc.ref_id)
                    .push(", sort_key = ")
                    .push_bind(doc.sort_key)
                    .push(", body = ")
                    .push_bind(::sqlx::types::Json(&doc.body))
                    .push(", updated_at = ")
                    .push_bind(doc.updated_at)
                    .push(" WHERE tenant_id = ")
                    .push_bind(doc.tenant_id.into_inner())
                    .push(" AND id = ")
                    .push_bind(doc.id);
                let done = qb
                    .build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(done.rows_affected() > 0)
            }

            async fn delete(
                &mut self,
                table: ::fabula_core::store::Table,
                tenant: ::fabula_types::TenantId,
                id: ::uuid::Uuid,
            ) -> Result<bool, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!("DELETE FROM {table}"));
                qb.push(" WHERE tenant_id = ")
                    .push_bind(tenant.into_inner())
                    .push(" AND id = ")
                    .push_bind(id);
                let done = qb
                    .build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(done.rows_affected() > 0)
            }

            async fn delete_where(
                &mut self,
                table: ::fabula_core::store::Table,
                tenant: ::fabula_types::TenantId,
                filter: ::fabula_core::store::Filter,
            ) -> Result<u64, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!("DELETE FROM {table}"));
                push_filter(&mut qb, tenant, filter);
                let done = qb
                    .build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(done.rows_affected())
            }

            async fn insert_relation(
                &mut self,
                relation: &::fabula_types::EntityRelation,
            ) -> Result<(), ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!(
                    "INSERT INTO entity_relations ({}) VALUES (",
                    $crate::sql::RELATION_COLUMNS
                ));
                qb.separated(", ")
                    .push_bind(relation.id.into_inner())
                    .push_bind(relation.tenant_id.into_inner())
                    .push_bind(relation.world_id.into_inner())
                    .push_bind(relation.source_type.as_str())
                    .push_bind(relation.source_id)
                    .push_bind(relation.target_type.as_str())
                    .push_bind(relation.target_id)
                    .push_bind(relation.relation_type.as_str())
                    .push_bind(relation.context_type.as_deref())
                    .push_bind(relation.context_id)
                    .push_bind(::sqlx::types::Json(&relation.attributes))
                    .push_bind(relation.summary.as_str())
                    .push_bind(relation.mirror_id.map(::fabula_types::RelationId::into_inner))
                    .push_bind(
                        relation
                            .created_by_user_id
                            .map(::fabula_types::UserId::into_inner),
                    )
                    .push_bind(relation.created_at)
                    .push_bind(relation.updated_at);
                qb.push(")");
                qb.build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(())
            }

            async fn get_relation(
                &mut self,
                tenant: ::fabula_types::TenantId,
                id: ::fabula_types::RelationId,
            ) -> Result<Option<::fabula_types::EntityRelation>, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!(
                    "SELECT {} FROM entity_relations",
                    $crate::sql::RELATION_COLUMNS
                ));
                qb.push(" WHERE tenant_id = ")
                    .push_bind(tenant.into_inner())
                    .push(" AND id = ")
                    .push_bind(id.into_inner());
                let row = qb
                    .build()
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                row.as_ref().map(relation).transpose()
            }

            async fn update_relation(
                &mut self,
                relation: &::fabula_types::EntityRelation,
            ) -> Result<bool, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(
                    "UPDATE entity_relations SET world_id = ",
                );
                qb.push_bind(relation.world_id.into_inner())
                    .push(", source_type = ")
                    .push_bind(relation.source_type.as_str())
                    .push(", source_id = ")
                    .push_bind(relation.source_id)
                    .push(", target_type = ")
                    .push_bind(relation.target_type.as_str())
                    .push(", target_id = ")
                    .push_bind(relation.target_id)
                    .push(", relation_type = ")
                    .push_bind(relation.relation_type.as_str())
                    .push(", context_type = ")
                    .push_bind(relation.context_type.as_deref())
                    .push(", context_id = ")
                    .push_bind(relation.context_id)
                    .push(", attributes = ")
                    .push_bind(::sqlx::types::Json(&relation.attributes))
                    .push(", summary = ")
                    .push_bind(relation.summary.as_str())
                    .push(", mirror_id = ")
                    .push_bind(relation.mirror_id.map(::fabula_types::RelationId::into_inner))
                    .push(", updated_at = ")
                    .push_bind(relation.updated_at)
                    .push(" WHERE tenant_id = ")
                    .push_bind(relation.tenant_id.into_inner())
                    .push(" AND id = ")
                    .push_bind(relation.id.into_inner());
                let done = qb
                    .build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(done.rows_affected() > 0)
            }

            async fn delete_relation(
                &mut self,
                tenant: ::fabula_types::TenantId,
                id: ::fabula_types::RelationId,
            ) -> Result<bool, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new("DELETE FROM entity_relations");
                qb.push(" WHERE tenant_id = ")
                    .push_bind(tenant.into_inner())
                    .push(" AND id = ")
                    .push_bind(id.into_inner());
                let done = qb
                    .build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(done.rows_affected() > 0)
            }

            async fn list_relations(
                &mut self,
                tenant: ::fabula_types::TenantId,
                query: &::fabula_core::store::RelationQuery,
            ) -> Result<Vec<::fabula_types::EntityRelation>, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new(format!(
                    "SELECT {} FROM entity_relations",
                    $crate::sql::RELATION_COLUMNS
                ));
                push_relation_query(&mut qb, tenant, query);
                let rows = qb
                    .build()
                    .fetch_all(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                rows.iter().map(relation).collect()
            }

            async fn delete_relations_touching(
                &mut self,
                tenant: ::fabula_types::TenantId,
                kind: ::fabula_types::EntityKind,
                id: ::uuid::Uuid,
            ) -> Result<u64, ::fabula_core::StoreError> {
                let mut qb = ::sqlx::QueryBuilder::<$db>::new("DELETE FROM entity_relations");
                qb.push(" WHERE tenant_id = ")
                    .push_bind(tenant.into_inner())
                    .push(" AND ((source_type = ")
                    .push_bind(kind.as_str())
                    .push(" AND source_id = ")
                    .push_bind(id)
                    .push(") OR (target_type = ")
                    .push_bind(kind.as_str())
                    .push(" AND target_id = ")
                    .push_bind(id)
                    .push("))");
                let done = qb
                    .build()
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::error::store_error)?;
                Ok(done.rows_affected())
            }

            async fn commit(self: Box<Self>) -> Result<(), ::fabula_core::StoreError> {
                self.tx.commit().await.map_err($crate::error::store_error)
            }
        }
    };
}

pub(crate) use sql_transaction;
