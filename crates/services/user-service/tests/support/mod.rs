//! In-memory storage driver for service-level tests.
//!
//! A unit of work edits a private copy of the table and publishes it on
//! commit, so rolled back or dropped units leave no trace. Ids come from a
//! shared counter and are never handed out twice, like a `SERIAL` column.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use common::{AppError, AppResult, DriverKind, PageRequest};
use domain::{NewUser, User};
use user_service_lib::infra::{TransactionMode, UnitOfWork, UnitOfWorkFactory};
use user_service_lib::repository::UserRepository;

type Table = BTreeMap<i32, User>;

#[derive(Default)]
struct Counters {
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Unit-of-work factory over a `BTreeMap` table.
#[derive(Clone, Default)]
pub struct InMemoryFactory {
    table: Arc<Mutex<Table>>,
    next_id: Arc<AtomicI32>,
    fail_updates: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl InMemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `update` call fail with a storage error
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    pub fn stored(&self, id: i32) -> Option<User> {
        self.table.lock().unwrap().get(&id).cloned()
    }

    pub fn begins(&self) -> usize {
        self.counters.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.counters.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.counters.rollbacks.load(Ordering::SeqCst)
    }

    fn repository(&self, table: Arc<Mutex<Table>>) -> MemoryUserRepository {
        MemoryUserRepository {
            table,
            next_id: self.next_id.clone(),
            fail_updates: self.fail_updates.clone(),
        }
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryFactory {
    fn kind(&self) -> DriverKind {
        DriverKind::Orm
    }

    async fn begin(&self, _mode: TransactionMode) -> AppResult<Box<dyn UnitOfWork>> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.table.lock().unwrap().clone();

        Ok(Box::new(MemoryUnitOfWork {
            users: self.repository(Arc::new(Mutex::new(snapshot))),
            published: self.table.clone(),
            counters: self.counters.clone(),
        }))
    }

    async fn reader(&self) -> AppResult<Box<dyn UserRepository>> {
        Ok(Box::new(self.repository(self.table.clone())))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

struct MemoryUnitOfWork {
    users: MemoryUserRepository,
    published: Arc<Mutex<Table>>,
    counters: Arc<Counters>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let working = self.users.table.lock().unwrap().clone();
        *self.published.lock().unwrap() = working;
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Repository over either the published table or a unit's private copy.
pub struct MemoryUserRepository {
    table: Arc<Mutex<Table>>,
    next_id: Arc<AtomicI32>,
    fail_updates: Arc<AtomicBool>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn add(&self, user: NewUser) -> AppResult<User> {
        let mut table = self.table.lock().unwrap();
        if table
            .values()
            .any(|u| u.username == user.username() || u.email == user.email())
        {
            return Err(AppError::ConstraintViolation(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = User {
            id,
            username: user.username().to_string(),
            email: user.email().to_string(),
            full_name: user.full_name().map(str::to_string),
            created_at: Utc::now().naive_utc(),
        };
        table.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.table.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let table = self.table.lock().unwrap();
        Ok(table.values().find(|u| u.username == username).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let table = self.table.lock().unwrap();
        Ok(table.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let table = self.table.lock().unwrap();
        Ok(table.values().any(|u| u.email == email))
    }

    async fn list_paginated(&self, page: PageRequest) -> AppResult<(Vec<User>, u64)> {
        let table = self.table.lock().unwrap();
        let items = table
            .values()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((items, table.len() as u64))
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::storage("simulated storage fault"));
        }

        let mut table = self.table.lock().unwrap();
        let stored = table.get_mut(&user.id).ok_or(AppError::NotFound)?;
        stored.full_name = user.full_name.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.table.lock().unwrap().remove(&id).is_some())
    }
}
