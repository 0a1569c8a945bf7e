//! Integration tests for the persistent store over the in-memory backend.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use pstore_core::config::PagingConfig;
use pstore_core::types::{Criteria, FilterField, QueryBase, SortField};
use pstore_core::{ErrorKind, PersistentStore};
use pstore_database::UnitOfWork;

use helpers::{Customer, Order, OrderId, TestContext, customer, roster};

fn names(customers: &[Customer]) -> Vec<&str> {
    customers.iter().map(|c| c.name.as_str()).collect()
}

fn by_name<'a>(customers: &'a [Customer], name: &str) -> &'a Customer {
    customers
        .iter()
        .find(|c| c.name == name)
        .expect("customer in roster")
}

#[tokio::test]
async fn test_add_commit_get_round_trip() {
    let ctx = TestContext::new();
    let ada = customer("Ada", "gold", 36, "London");

    ctx.customers().add(ada.clone()).await.unwrap();
    assert_eq!(ctx.uow.commit().await.unwrap(), 1);

    let fresh = ctx.fresh_session();
    assert_eq!(fresh.customers().get(&ada.id).await.unwrap(), ada);
}

#[tokio::test]
async fn test_absent_key() {
    let ctx = TestContext::seeded(roster()).await;
    let store = ctx.customers();
    let missing = Uuid::new_v4();

    assert_eq!(store.find_by_id(&missing).await.unwrap(), None);
    let err = store.get(&missing).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_find_by_ids_skips_missing() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let ada = by_name(&customers, "Ada");
    let alan = by_name(&customers, "Alan");

    let found = ctx
        .customers()
        .find_by_ids(&[alan.id, Uuid::new_v4(), ada.id, alan.id])
        .await
        .unwrap();
    assert_eq!(names(&found), ["Alan", "Ada"]);
    assert!(ctx.customers().find_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exists_requires_every_key() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();
    let ids: Vec<Uuid> = customers.iter().map(|c| c.id).collect();

    assert!(store.exists(&ids).await.unwrap());
    assert!(store.exists(&ids[..1]).await.unwrap());
    assert!(!store.exists(&[ids[0], Uuid::new_v4()]).await.unwrap());
    assert!(!store.exists(&[]).await.unwrap());
}

#[tokio::test]
async fn test_single_cardinality() {
    let ctx = TestContext::seeded(roster()).await;
    let store = ctx.customers();

    let edsger = store.single(&FilterField::eq("tier", "bronze")).await.unwrap();
    assert_eq!(edsger.name, "Edsger");

    let err = store.single(&FilterField::eq("tier", "gold")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cardinality);
    assert!(err.message.contains("more than one"));

    let err = store.single(&FilterField::eq("tier", "platinum")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cardinality);
    assert!(err.message.contains("found 0"));
}

#[tokio::test]
async fn test_query_filters_and_orders() {
    let ctx = TestContext::seeded(roster()).await;
    let query = QueryBase::new()
        .filter(&FilterField::eq("address.city", "London"))
        .order_by(SortField::desc("age"))
        .page(1, 1);

    let found = ctx.customers().query(&query).await.unwrap();
    assert_eq!(names(&found), ["Barbara", "Ada"]);

    let found = ctx.customers().query_as_no_tracking(&query).await.unwrap();
    assert_eq!(names(&found), ["Barbara", "Ada"]);
}

#[tokio::test]
async fn test_queryable_combinators() {
    let ctx = TestContext::seeded(roster()).await;
    let store = ctx.customers();
    let query = store
        .find_as_no_tracking()
        .filter(&FilterField::gte("age", 40))
        .order_by(SortField::asc("name"))
        .skip(1)
        .take(2);

    assert_eq!(names(&query.to_list().await.unwrap()), ["Barbara", "Edsger"]);
    assert_eq!(query.count().await.unwrap(), 2);
    assert!(query.any().await.unwrap());
    assert_eq!(query.first().await.unwrap().unwrap().name, "Barbara");

    let none = store.find().filter(&FilterField::gt("age", 100));
    assert!(!none.any().await.unwrap());
    assert_eq!(none.first().await.unwrap(), None);
}

#[tokio::test]
async fn test_criteria_composition() {
    let ctx = TestContext::seeded(roster()).await;
    let store = ctx.customers();

    let criteria = Criteria::from(FilterField::eq("tier", "gold"))
        .or(FilterField::eq("tier", "silver"))
        .and(Criteria::from(FilterField::eq("address.city", "London")).not());
    let found = store
        .find_by(&criteria)
        .order_by(SortField::asc("name"))
        .to_list()
        .await
        .unwrap();
    assert_eq!(names(&found), ["Alan", "Grace"]);

    let found = store
        .find_by(&FilterField::ilike("name", "a%"))
        .order_by(SortField::asc("name"))
        .to_list()
        .await
        .unwrap();
    assert_eq!(names(&found), ["Ada", "Alan"]);

    assert_eq!(store.find_by(&FilterField::is_null("nickname")).count().await.unwrap(), 5);
    assert_eq!(
        store
            .find_by(&FilterField::is_in("tier", vec!["gold", "bronze"]))
            .count()
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_malformed_criteria_rejected() {
    let ctx = TestContext::seeded(roster()).await;
    let err = ctx
        .customers()
        .find_by(&Criteria::And(Vec::new()))
        .to_list()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_pager_total_is_page_invariant() {
    let customers: Vec<Customer> = (0..23)
        .map(|i| customer(&format!("c{i:02}"), "gold", 20 + i, "London"))
        .collect();
    let ctx = TestContext::seeded(customers).await;
    let store = ctx.customers();

    let mut seen = HashSet::new();
    for page in 1..=5 {
        let result = store
            .pager_query_as_no_tracking(&QueryBase::new().page(page, 5))
            .await
            .unwrap();
        assert_eq!(result.total_items, 23);
        assert_eq!(result.total_pages, 5);
        assert_eq!(result.has_previous, page > 1);
        assert_eq!(result.has_next, page < 5);
        assert_eq!(result.items.len(), if page == 5 { 3 } else { 5 });
        seen.extend(result.items.into_iter().map(|c| c.id));
    }
    assert_eq!(seen.len(), 23);

    let beyond = store
        .pager_query(&QueryBase::new().page(6, 5))
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_items, 23);
    assert!(!beyond.has_next);
}

#[tokio::test]
async fn test_pager_validation() {
    let ctx = TestContext::seeded(roster()).await;
    let store = ctx.customers();

    for query in [
        QueryBase::new().page(0, 10),
        QueryBase::new().page(1, 0),
        QueryBase::new().page(1, 101),
    ] {
        let err = store.pager_query(&query).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    let page = store.pager_query(&QueryBase::new()).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 25);
    assert_eq!(page.items.len(), 5);
}

#[tokio::test]
async fn test_pager_uses_configured_limits() {
    let ctx = TestContext::seeded(roster()).await;
    let paging = PagingConfig {
        default_page_size: 2,
        max_page_size: 3,
    };
    let uow = UnitOfWork::with_paging(Arc::clone(&ctx.backend), paging);
    let store = uow.store::<Customer, Uuid>();

    let page = store
        .pager_query(&QueryBase::new().order_by(SortField::asc("name")))
        .await
        .unwrap();
    assert_eq!(names(&page.items), ["Ada", "Alan"]);
    assert_eq!(page.total_pages, 3);

    let err = store
        .pager_query(&QueryBase::new().page(1, 4))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_remove_then_find() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();
    let ada = by_name(&customers, "Ada");

    store.remove(ada).await.unwrap();
    assert_eq!(store.find_by_id(&ada.id).await.unwrap(), None);
    assert!(!store.exists(&[ada.id]).await.unwrap());
    assert_eq!(store.find().to_list().await.unwrap().len(), 4);
    assert_eq!(store.find_as_no_tracking().to_list().await.unwrap().len(), 5);

    store.commit().await.unwrap();
    let fresh = ctx.fresh_session();
    assert_eq!(fresh.customers().find_by_id(&ada.id).await.unwrap(), None);
    assert_eq!(ctx.backend.len("customers").unwrap(), 4);
}

#[tokio::test]
async fn test_single_ignores_staged_removals() {
    let mut customers = roster();
    customers.push(customer("Hedy", "gold", 54, "Vienna"));
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();

    // Lowest keys first, the order the backend returns them in.
    let mut gold: Vec<&Customer> = customers.iter().filter(|c| c.tier == "gold").collect();
    gold.sort_by_key(|c| c.id.to_string());

    store.remove(gold[0]).await.unwrap();
    let err = store.single(&FilterField::eq("tier", "gold")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cardinality);

    store.remove(gold[1]).await.unwrap();
    let last = store.single(&FilterField::eq("tier", "gold")).await.unwrap();
    assert_eq!(last.id, gold[2].id);
}

#[tokio::test]
async fn test_tracked_windows_skip_staged_removals() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();
    store.remove(by_name(&customers, "Ada")).await.unwrap();

    let by_age = store.find().order_by(SortField::asc("age"));
    assert_eq!(by_age.first().await.unwrap().unwrap().name, "Alan");
    assert_eq!(by_age.count().await.unwrap(), 4);
    assert!(by_age.any().await.unwrap());

    let window = store.find().order_by(SortField::asc("age")).skip(1).take(2);
    assert_eq!(names(&window.to_list().await.unwrap()), ["Barbara", "Edsger"]);
    assert_eq!(window.count().await.unwrap(), 2);

    let query = QueryBase::new().order_by(SortField::asc("age"));
    let first = store.pager_query(&query.clone().page(1, 2)).await.unwrap();
    assert_eq!(names(&first.items), ["Alan", "Barbara"]);
    assert_eq!(first.total_items, 4);
    assert_eq!(first.total_pages, 2);
    let second = store.pager_query(&query.clone().page(2, 2)).await.unwrap();
    assert_eq!(names(&second.items), ["Edsger", "Grace"]);
    assert!(!second.has_next);

    let untracked = store.find_as_no_tracking().order_by(SortField::asc("age"));
    assert_eq!(untracked.first().await.unwrap().unwrap().name, "Ada");
    assert_eq!(untracked.count().await.unwrap(), 5);
    let page = store.pager_query_as_no_tracking(&query.page(1, 2)).await.unwrap();
    assert_eq!(page.total_items, 5);
}

#[tokio::test]
async fn test_remove_missing_rejects_batch() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();
    let ada = by_name(&customers, "Ada");

    let err = store
        .remove_by_ids(&[ada.id, Uuid::new_v4()])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(!ctx.uow.has_changes());

    store.remove_by_id(&ada.id).await.unwrap();
    let err = store.remove_by_id(&ada.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(ctx.uow.pending_count(), 1);
}

#[tokio::test]
async fn test_remove_range() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();

    store.remove_range(&customers[..3]).await.unwrap();
    assert_eq!(store.commit().await.unwrap(), 3);
    assert_eq!(ctx.backend.len("customers").unwrap(), 2);
}

#[tokio::test]
async fn test_update_persists_on_commit() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();

    let mut ada = store.get(&by_name(&customers, "Ada").id).await.unwrap();
    ada.age = 37;
    store.update(ada.clone()).await.unwrap();
    store.commit().await.unwrap();

    let fresh = ctx.fresh_session();
    assert_eq!(fresh.customers().get(&ada.id).await.unwrap().age, 37);
}

#[tokio::test]
async fn test_update_errors() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();

    let stranger = customer("Stranger", "gold", 30, "Paris");
    let err = store.update(stranger).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut ada = by_name(&customers, "Ada").clone();
    ada.email = "not-an-email".into();
    let err = store.update(ada.clone()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    store.remove_by_id(&ada.id).await.unwrap();
    ada.email = "ada@example.com".into();
    let err = store.update(ada).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_add_conflicts() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();

    let newcomer = customer("Newcomer", "gold", 20, "Leeds");
    store.add(newcomer.clone()).await.unwrap();
    let err = store.add(newcomer).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    ctx.uow.discard().unwrap();

    // the session has not seen Ada, so the duplicate surfaces at commit
    store.add(by_name(&customers, "Ada").clone()).await.unwrap();
    let err = store.commit().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(ctx.uow.pending_count(), 1);
    assert_eq!(ctx.backend.len("customers").unwrap(), 5);
}

#[tokio::test]
async fn test_add_range_is_atomic() {
    let ctx = TestContext::new();
    let store = ctx.customers();

    let mut bad = customer("Bad", "gold", 1, "Nowhere");
    bad.email = "nope".into();
    let err = store
        .add_range(vec![customer("Good", "gold", 1, "Leeds"), bad])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(!ctx.uow.has_changes());

    let twin = customer("Twin", "gold", 1, "Leeds");
    let err = store
        .add_range(vec![twin.clone(), twin])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(!ctx.uow.has_changes());
}

#[tokio::test]
async fn test_add_then_remove_cancels() {
    let ctx = TestContext::new();
    let store = ctx.customers();
    let c = customer("Fleeting", "gold", 1, "Leeds");

    store.add(c.clone()).await.unwrap();
    store.remove(&c).await.unwrap();
    assert!(!ctx.uow.has_changes());
    assert_eq!(store.commit().await.unwrap(), 0);
    assert!(ctx.backend.is_empty("customers").unwrap());
}

#[tokio::test]
async fn test_tracking_behaviour() {
    let customers = roster();
    let ctx = TestContext::seeded(customers.clone()).await;
    let store = ctx.customers();

    store.find_as_no_tracking().to_list().await.unwrap();
    assert_eq!(ctx.uow.tracked_count(), 0);

    store.find().to_list().await.unwrap();
    assert_eq!(ctx.uow.tracked_count(), 5);

    let mut ada = by_name(&customers, "Ada").clone();
    ada.age = 99;
    store.update(ada).await.unwrap();

    let tracked = store.find_by(&FilterField::eq("name", "Ada")).first().await.unwrap();
    assert_eq!(tracked.unwrap().age, 99);
    let untracked = store
        .find_as_no_tracking()
        .filter(&FilterField::eq("name", "Ada"))
        .first()
        .await
        .unwrap();
    assert_eq!(untracked.unwrap().age, 36);
}

#[tokio::test]
async fn test_discard_forgets_changes() {
    let ctx = TestContext::new();
    let store = ctx.customers();
    let c = customer("Draft", "gold", 1, "Leeds");

    store.add(c.clone()).await.unwrap();
    ctx.uow.discard().unwrap();
    assert_eq!(store.find_by_id(&c.id).await.unwrap(), None);
    assert_eq!(store.commit().await.unwrap(), 0);
}

#[tokio::test]
async fn test_custom_key_type() {
    let ctx = TestContext::new();
    let orders = ctx.orders();
    let order = Order {
        id: OrderId::new(),
        customer_id: Uuid::new_v4(),
        total_cents: 1200,
    };

    orders.add(order.clone()).await.unwrap();
    orders.commit().await.unwrap();

    let fresh = ctx.fresh_session();
    assert_eq!(fresh.orders().get(&order.id).await.unwrap(), order);
    let big = fresh
        .orders()
        .find_by(&FilterField::gt("total_cents", 1000))
        .to_list()
        .await
        .unwrap();
    assert_eq!(big, vec![order]);

    let negative = Order {
        id: OrderId::new(),
        customer_id: Uuid::new_v4(),
        total_cents: -1,
    };
    let err = fresh.orders().add(negative).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_stores_share_a_session() {
    let ctx = TestContext::new();
    let c = customer("Shared", "gold", 1, "Leeds");

    ctx.customers().add(c.clone()).await.unwrap();
    assert_eq!(ctx.customers().find_by_id(&c.id).await.unwrap(), Some(c));
    assert_eq!(ctx.uow.pending_count(), 1);
}
