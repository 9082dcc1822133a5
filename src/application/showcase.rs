//! Configured front-page banners, announcements and the avatar gallery.

use std::sync::Arc;

use crate::application::cdn::PathTranslator;
use crate::application::views::{AnnouncementView, AvatarView, BannerView};
use crate::config::ShowcaseSettings;
use crate::domain::assets::RelativePath;

pub struct ShowcaseService {
    settings: Arc<ShowcaseSettings>,
    cdn: Arc<PathTranslator>,
}

impl ShowcaseService {
    pub fn new(settings: Arc<ShowcaseSettings>, cdn: Arc<PathTranslator>) -> Self {
        Self { settings, cdn }
    }

    /// Enabled banners with an image, ordered by `sort_order`.
    pub fn banners(&self) -> Vec<BannerView> {
        let mut banners: Vec<_> = self
            .settings
            .banners
            .iter()
            .filter(|banner| banner.enabled && !banner.image.trim().is_empty())
            .collect();
        banners.sort_by_key(|banner| banner.sort_order);

        banners
            .into_iter()
            .map(|banner| BannerView {
                image_url: self.cdn.absolute(&RelativePath::new(banner.image.trim())),
                title: banner.title.clone(),
                link: banner.link.clone(),
                manga_id: banner.manga_id,
                sort_order: banner.sort_order,
            })
            .collect()
    }

    /// Enabled announcements ordered by `sort_order`; ties keep configuration order.
    pub fn announcements(&self) -> Vec<AnnouncementView> {
        let mut announcements: Vec<_> = self
            .settings
            .announcements
            .iter()
            .filter(|announcement| announcement.enabled)
            .collect();
        announcements.sort_by_key(|announcement| announcement.sort_order);

        announcements
            .into_iter()
            .map(|announcement| AnnouncementView {
                title: announcement.title.clone(),
                content: announcement.content.clone(),
                kind: announcement.kind.clone(),
                link: announcement.link.clone(),
                sort_order: announcement.sort_order,
            })
            .collect()
    }

    /// One URL per configured avatar name: `prefix + name + suffix`.
    pub fn avatars(&self) -> AvatarView {
        let avatars = &self.settings.avatars;
        let urls = avatars
            .names
            .iter()
            .map(|name| {
                let path = format!("{}{}{}", avatars.prefix, name, avatars.suffix);
                self.cdn.absolute(&RelativePath::new(path))
            })
            .collect();
        AvatarView { urls }
    }
}
