#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use manga_catalog::application::admin::CatalogWriteService;
use manga_catalog::application::catalog::CatalogReadService;
use manga_catalog::application::cdn::PathTranslator;
use manga_catalog::application::chapters::ChapterReadService;
use manga_catalog::application::pagination::{Page, PageRequest};
use manga_catalog::application::repos::{
    CatalogRepo, CatalogWriteRepo, MangaFacet, MangaSearch, RepoError,
};
use manga_catalog::application::showcase::ShowcaseService;
use manga_catalog::cache::{
    CacheConfig, CacheRegion, CacheStore, CacheStoreError, InvalidationCoordinator,
    MemoryCacheStore, QueryCache,
};
use manga_catalog::config::{CdnSettings, ShowcaseSettings};
use manga_catalog::domain::assets::RelativePath;
use manga_catalog::domain::entities::{ChapterRecord, MangaRecord, NewChapter, NewManga};
use manga_catalog::domain::filters::SearchSort;
use manga_catalog::infra::http::{AdminState, HealthCheck, HttpState};
use time::OffsetDateTime;

pub const CDN_BASE: &str = "https://cdn.example.com";

pub fn cdn_settings() -> CdnSettings {
    CdnSettings {
        base_url: Some(CDN_BASE.to_string()),
        fallback_url: Some("https://origin.example.com".to_string()),
        ..CdnSettings::default()
    }
}

pub fn manga(id: i64, title: &str) -> MangaRecord {
    let now = OffsetDateTime::from_unix_timestamp(1_700_000_000 + id).expect("timestamp");
    MangaRecord {
        id,
        title: title.to_string(),
        old_name: None,
        description: Some(format!("{title} description")),
        cover_image: RelativePath::new(format!("/covers/{id}.jpg")),
        detail_images: vec![RelativePath::new(format!("/details/{id}-1.jpg"))],
        author: Some("Author".to_string()),
        slogan: None,
        is_choiceness: false,
        is_recommend: false,
        is_new: false,
        period: None,
        is_putaway: true,
        putaway_time: None,
        online_time: None,
        tendency: None,
        country: None,
        is_finish: None,
        sort_order: 0,
        view_count: 0,
        favorite_count: 0,
        chapter_count: 0,
        tags: Vec::new(),
        labels: Vec::new(),
        source: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn chapter(id: i64, manga_id: i64, number: i32) -> ChapterRecord {
    ChapterRecord {
        id,
        manga_id,
        title: format!("Chapter {number}"),
        chapter_number: number,
        view_count: 0,
        page_urls: vec![
            RelativePath::new(format!("/pages/{manga_id}/{number}/1.jpg")),
            RelativePath::new(format!("/pages/{manga_id}/{number}/2.jpg")),
        ],
        created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
    }
}

#[derive(Default)]
struct CatalogData {
    manga: Vec<MangaRecord>,
    chapters: Vec<ChapterRecord>,
    next_manga_id: i64,
    next_chapter_id: i64,
}

/// In-memory catalog store counting every read that reaches it.
#[derive(Default)]
pub struct FakeCatalog {
    data: Mutex<CatalogData>,
    pub list_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub find_calls: AtomicUsize,
    pub sample_calls: AtomicUsize,
    pub tag_calls: AtomicUsize,
    pub chapter_calls: AtomicUsize,
    pub fail_reads: AtomicBool,
}

impl FakeCatalog {
    pub fn with_manga(manga: Vec<MangaRecord>) -> Arc<Self> {
        let fake = Self::default();
        {
            let mut data = fake.data.lock().unwrap();
            data.next_manga_id = manga.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            data.next_chapter_id = 1;
            data.manga = manga;
        }
        Arc::new(fake)
    }

    pub fn add_chapter(&self, chapter: ChapterRecord) {
        let mut data = self.data.lock().unwrap();
        data.next_chapter_id = data.next_chapter_id.max(chapter.id + 1);
        data.chapters.push(chapter);
    }

    /// Changes a title behind the cache's back.
    pub fn rename(&self, id: i64, title: &str) {
        let mut data = self.data.lock().unwrap();
        if let Some(record) = data.manga.iter_mut().find(|m| m.id == id) {
            record.title = title.to_string();
        }
    }

    pub fn views(&self, id: i64) -> i64 {
        let data = self.data.lock().unwrap();
        data.manga
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.view_count)
            .unwrap_or(-1)
    }

    pub fn chapter_views(&self, id: i64) -> i64 {
        let data = self.data.lock().unwrap();
        data.chapters
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.view_count)
            .unwrap_or(-1)
    }

    pub fn stored_manga(&self, id: i64) -> Option<MangaRecord> {
        self.data
            .lock()
            .unwrap()
            .manga
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<(), RepoError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }

    fn with_chapter_count(data: &CatalogData, mut record: MangaRecord) -> MangaRecord {
        record.chapter_count = data
            .chapters
            .iter()
            .filter(|c| c.manga_id == record.id)
            .count() as i64;
        record
    }

    fn paginate(records: Vec<MangaRecord>, page: PageRequest) -> Page<MangaRecord> {
        let total = records.len() as i64;
        let items = records
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Page::new(items, page, total)
    }
}

fn matches_facet(record: &MangaRecord, facet: &MangaFacet) -> bool {
    match facet {
        MangaFacet::All | MangaFacet::Latest | MangaFacet::Popular => true,
        MangaFacet::Curated => record.is_choiceness,
        MangaFacet::Recommended => record.is_recommend,
        MangaFacet::NewReleases => record.is_new,
        MangaFacet::Country(country) => record.country.as_deref() == Some(country.as_str()),
        MangaFacet::Audience(tendency) => record.tendency.as_deref() == Some(tendency.as_str()),
        MangaFacet::Tag(tag) => record.tags.iter().any(|t| t == tag),
    }
}

#[async_trait]
impl CatalogRepo for FakeCatalog {
    async fn list_manga(
        &self,
        facet: &MangaFacet,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        let mut records: Vec<MangaRecord> = data
            .manga
            .iter()
            .filter(|m| m.is_putaway && matches_facet(m, facet))
            .map(|m| Self::with_chapter_count(&data, m.clone()))
            .collect();
        match facet {
            MangaFacet::Popular => records.sort_by(|a, b| b.view_count.cmp(&a.view_count)),
            MangaFacet::Latest | MangaFacet::NewReleases => {
                records.sort_by(|a, b| b.created_at.cmp(&a.created_at))
            }
            _ => records.sort_by(|a, b| {
                a.sort_order
                    .cmp(&b.sort_order)
                    .then(b.created_at.cmp(&a.created_at))
            }),
        }
        Ok(Self::paginate(records, page))
    }

    async fn search_manga(
        &self,
        search: &MangaSearch,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let keyword = search.keyword.to_lowercase();
        let data = self.data.lock().unwrap();
        let mut records: Vec<MangaRecord> = data
            .manga
            .iter()
            .filter(|m| m.is_putaway && m.title.to_lowercase().contains(&keyword))
            .filter(|m| match &search.tag {
                Some(tag) => m.tags.iter().any(|t| t == tag),
                None => true,
            })
            .cloned()
            .collect();
        if search.sort == SearchSort::Updated {
            records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }
        Ok(Self::paginate(records, page))
    }

    async fn find_manga(&self, id: i64) -> Result<Option<MangaRecord>, RepoError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .manga
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .map(|m| Self::with_chapter_count(&data, m)))
    }

    async fn sample_manga(
        &self,
        exclude_id: i64,
        limit: u32,
    ) -> Result<Vec<MangaRecord>, RepoError> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .manga
            .iter()
            .filter(|m| m.is_putaway && m.id != exclude_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<String>, RepoError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        let mut tags: Vec<String> = data
            .manga
            .iter()
            .filter(|m| m.is_putaway)
            .flat_map(|m| m.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    async fn list_chapters(&self, manga_id: i64) -> Result<Vec<ChapterRecord>, RepoError> {
        self.chapter_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        let mut chapters: Vec<ChapterRecord> = data
            .chapters
            .iter()
            .filter(|c| c.manga_id == manga_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.chapter_number);
        Ok(chapters)
    }

    async fn find_chapter(&self, id: i64) -> Result<Option<ChapterRecord>, RepoError> {
        self.chapter_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        Ok(data.chapters.iter().find(|c| c.id == id).cloned())
    }

    async fn find_chapter_by_number(
        &self,
        manga_id: i64,
        number: i32,
    ) -> Result<Option<ChapterRecord>, RepoError> {
        self.chapter_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .chapters
            .iter()
            .find(|c| c.manga_id == manga_id && c.chapter_number == number)
            .cloned())
    }
}

fn insert_into(data: &mut CatalogData, manga: NewManga) -> MangaRecord {
    let id = data.next_manga_id.max(1);
    data.next_manga_id = id + 1;
    let now = OffsetDateTime::now_utc();
    for new_chapter in manga.chapters.iter() {
        let chapter_id = data.next_chapter_id.max(1);
        data.next_chapter_id = chapter_id + 1;
        data.chapters.push(ChapterRecord {
            id: chapter_id,
            manga_id: id,
            title: new_chapter.title.clone(),
            chapter_number: new_chapter.chapter_number,
            view_count: 0,
            page_urls: new_chapter.page_urls.clone(),
            created_at: now,
        });
    }
    let record = MangaRecord {
        id,
        title: manga.title,
        old_name: manga.old_name,
        description: manga.description,
        cover_image: manga.cover_image,
        detail_images: manga.detail_images,
        author: manga.author,
        slogan: manga.slogan,
        is_choiceness: manga.is_choiceness,
        is_recommend: manga.is_recommend,
        is_new: manga.is_new,
        period: manga.period,
        is_putaway: manga.is_putaway,
        putaway_time: manga.putaway_time,
        online_time: manga.online_time,
        tendency: manga.tendency,
        country: manga.country,
        is_finish: manga.is_finish,
        sort_order: manga.sort_order,
        view_count: 0,
        favorite_count: 0,
        chapter_count: manga.chapters.len() as i64,
        tags: manga.tags,
        labels: manga.labels,
        source: manga.source,
        created_at: now,
        updated_at: now,
    };
    data.manga.push(record.clone());
    record
}

#[async_trait]
impl CatalogWriteRepo for FakeCatalog {
    async fn insert_manga(&self, manga: NewManga) -> Result<MangaRecord, RepoError> {
        let mut data = self.data.lock().unwrap();
        Ok(insert_into(&mut data, manga))
    }

    async fn insert_manga_batch(
        &self,
        batch: Vec<NewManga>,
    ) -> Result<Vec<MangaRecord>, RepoError> {
        let mut data = self.data.lock().unwrap();
        Ok(batch
            .into_iter()
            .map(|manga| insert_into(&mut data, manga))
            .collect())
    }

    async fn delete_manga(&self, id: i64) -> Result<bool, RepoError> {
        let mut data = self.data.lock().unwrap();
        let before = data.manga.len();
        data.manga.retain(|m| m.id != id);
        data.chapters.retain(|c| c.manga_id != id);
        Ok(data.manga.len() != before)
    }

    async fn insert_chapter(
        &self,
        manga_id: i64,
        chapter: NewChapter,
    ) -> Result<ChapterRecord, RepoError> {
        let mut data = self.data.lock().unwrap();
        if !data.manga.iter().any(|m| m.id == manga_id) {
            return Err(RepoError::NotFound);
        }
        if data
            .chapters
            .iter()
            .any(|c| c.manga_id == manga_id && c.chapter_number == chapter.chapter_number)
        {
            return Err(RepoError::Duplicate {
                constraint: "chapters_manga_number_key".to_string(),
            });
        }
        let id = data.next_chapter_id.max(1);
        data.next_chapter_id = id + 1;
        let record = ChapterRecord {
            id,
            manga_id,
            title: chapter.title,
            chapter_number: chapter.chapter_number,
            view_count: 0,
            page_urls: chapter.page_urls,
            created_at: OffsetDateTime::now_utc(),
        };
        data.chapters.push(record.clone());
        Ok(record)
    }

    async fn delete_chapter(&self, id: i64) -> Result<Option<ChapterRecord>, RepoError> {
        let mut data = self.data.lock().unwrap();
        let position = data.chapters.iter().position(|c| c.id == id);
        Ok(position.map(|index| data.chapters.remove(index)))
    }

    async fn increment_manga_views(&self, id: i64) -> Result<bool, RepoError> {
        let mut data = self.data.lock().unwrap();
        match data.manga.iter_mut().find(|m| m.id == id) {
            Some(record) => {
                record.view_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_chapter_views(&self, id: i64) -> Result<bool, RepoError> {
        let mut data = self.data.lock().unwrap();
        match data.chapters.iter_mut().find(|c| c.id == id) {
            Some(record) => {
                record.view_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl HealthCheck for FakeCatalog {
    async fn ping(&self) -> Result<(), RepoError> {
        self.check_reads()
    }
}

/// Cache store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _region: CacheRegion, _key: &str) -> Result<Option<String>, CacheStoreError> {
        Err(CacheStoreError::unavailable("store offline"))
    }

    async fn put(
        &self,
        _region: CacheRegion,
        _key: &str,
        _payload: String,
        _ttl: Duration,
    ) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::unavailable("store offline"))
    }

    async fn clear_region(&self, _region: CacheRegion) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::unavailable("store offline"))
    }
}

/// Fully wired services over a [`FakeCatalog`].
pub struct Harness {
    pub repo: Arc<FakeCatalog>,
    pub store: Arc<dyn CacheStore>,
    pub cdn: Arc<PathTranslator>,
    pub catalog: Arc<CatalogReadService>,
    pub chapters: Arc<ChapterReadService>,
    pub writes: Arc<CatalogWriteService>,
    pub showcase: Arc<ShowcaseService>,
}

impl Harness {
    pub fn new(repo: Arc<FakeCatalog>) -> Self {
        let config = CacheConfig::default();
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&config));
        Self::build(repo, config, store, cdn_settings(), ShowcaseSettings::default())
    }

    pub fn with_store(repo: Arc<FakeCatalog>, store: Arc<dyn CacheStore>) -> Self {
        Self::build(
            repo,
            CacheConfig::default(),
            store,
            cdn_settings(),
            ShowcaseSettings::default(),
        )
    }

    pub fn build(
        repo: Arc<FakeCatalog>,
        config: CacheConfig,
        store: Arc<dyn CacheStore>,
        cdn: CdnSettings,
        showcase: ShowcaseSettings,
    ) -> Self {
        let cdn = Arc::new(PathTranslator::new(&cdn));
        let cache = Arc::new(QueryCache::new(config.clone(), store.clone()));
        let invalidation = Arc::new(InvalidationCoordinator::new(config, store.clone()));
        let read_repo: Arc<dyn CatalogRepo> = repo.clone();
        let write_repo: Arc<dyn CatalogWriteRepo> = repo.clone();
        Self {
            catalog: Arc::new(CatalogReadService::new(
                read_repo.clone(),
                cache.clone(),
                cdn.clone(),
            )),
            chapters: Arc::new(ChapterReadService::new(read_repo, cache, cdn.clone())),
            writes: Arc::new(CatalogWriteService::new(
                write_repo,
                invalidation,
                cdn.clone(),
            )),
            showcase: Arc::new(ShowcaseService::new(Arc::new(showcase), cdn.clone())),
            repo,
            store,
            cdn,
        }
    }

    pub fn http_state(&self) -> HttpState {
        HttpState {
            catalog: self.catalog.clone(),
            chapters: self.chapters.clone(),
            showcase: self.showcase.clone(),
            views: self.writes.clone(),
            cdn: self.cdn.clone(),
            health: self.repo.clone(),
        }
    }

    pub fn admin_state(&self) -> AdminState {
        AdminState {
            writes: self.writes.clone(),
            health: self.repo.clone(),
        }
    }
}
