pub mod config;
pub mod types;

pub use config::Config;
pub use types::{
    Author, BlogPost, CardList, Category, ColorValue, FeaturedArticles, File, Footer, Header,
    NavItem, Page, PageComponent, RecentArticles, Seo, ViewType,
};
