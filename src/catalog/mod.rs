//! Catalog access
//!
//! Read-only views over the ingested media catalog: shows with their
//! episodes and break markers, movies, specials and commercials. The engine
//! never writes here; ingestion and video analysis populate these tables
//! offline.
//!
//! [`CatalogReader`] is the seam the engine is built against, with a SQLite
//! implementation for real catalogs and an in-memory one for tests.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::Result;
use crate::models::{
    BreakMarker, Commercial, Episode, MediaId, Movie, Show, ShowId, Special,
};

/// Read-only catalog surface consumed by the engine
pub trait CatalogReader {
    /// Look up a single show
    fn show(&self, id: ShowId) -> Result<Option<Show>>;

    /// Shows available for scheduling in `year`: currently airing, or
    /// finished and syndicated
    fn shows_airable_in_year(&self, year: i32) -> Result<Vec<Show>>;

    /// All episodes of a show, ordered by season and episode number
    fn episodes(&self, show: ShowId) -> Result<Vec<Episode>>;

    /// Movies passing the rating filter; an empty filter admits everything
    fn movies(&self, ratings: &[String]) -> Result<Vec<Movie>>;

    /// All specials
    fn specials(&self) -> Result<Vec<Special>>;

    /// Commercials no longer than `max_secs` whose air year falls in
    /// `[from_year, to_year]`
    fn commercials(&self, max_secs: u32, from_year: i32, to_year: i32)
        -> Result<Vec<Commercial>>;

    /// Episodes tagged with a seasonal label (`christmas`, `thanksgiving`),
    /// paired with their shows
    fn seasonal_episodes(&self, season: &str) -> Result<Vec<(Show, Episode)>>;

    /// Movies tagged with a seasonal label
    fn seasonal_movies(&self, season: &str) -> Result<Vec<Movie>>;

    /// Specials tagged with a seasonal label
    fn seasonal_specials(&self, season: &str) -> Result<Vec<Special>>;
}

// ============================================================================
// SQLite Catalog
// ============================================================================

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed catalog. List-valued columns (genres, durations, networks)
/// are stored comma-separated, matching the ingestion scripts.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open (and initialize if needed) a catalog database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(crate::error::Error::Database)?;
        Self::from_connection(conn)
    }

    /// In-memory catalog, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(crate::error::Error::Database)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS shows (
                show_id     INTEGER PRIMARY KEY,
                title       TEXT NOT NULL,
                genres      TEXT NOT NULL DEFAULT '',
                durations   TEXT NOT NULL DEFAULT '',
                start_year  INTEGER NOT NULL,
                end_year    INTEGER NOT NULL,
                networks    TEXT NOT NULL DEFAULT '',
                syndicated  INTEGER NOT NULL DEFAULT 0,
                popularity  REAL NOT NULL DEFAULT 1.0
            );
            CREATE TABLE IF NOT EXISTS episodes (
                episode_id      INTEGER PRIMARY KEY,
                show_id         INTEGER NOT NULL REFERENCES shows (show_id),
                air_date        TEXT NOT NULL,
                season_number   INTEGER NOT NULL DEFAULT 1,
                episode_number  INTEGER NOT NULL DEFAULT 1,
                season          TEXT NOT NULL DEFAULT 'any',
                start_point     INTEGER NOT NULL,
                end_point       INTEGER NOT NULL,
                file            TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS commercial_breaks (
                media_id     INTEGER NOT NULL REFERENCES episodes (episode_id),
                break_point  INTEGER NOT NULL,
                resume_point INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS movies (
                movie_id     INTEGER PRIMARY KEY,
                title        TEXT NOT NULL,
                genres       TEXT NOT NULL DEFAULT '',
                release_year INTEGER NOT NULL,
                season       TEXT NOT NULL DEFAULT 'any',
                rating       TEXT NOT NULL DEFAULT 'G',
                start_point  INTEGER NOT NULL,
                end_point    INTEGER NOT NULL,
                file         TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS specials (
                special_id  INTEGER PRIMARY KEY,
                title       TEXT NOT NULL,
                genres      TEXT NOT NULL DEFAULT '',
                air_year    INTEGER NOT NULL,
                season      TEXT NOT NULL DEFAULT 'any',
                start_point INTEGER NOT NULL,
                end_point   INTEGER NOT NULL,
                file        TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS commercials (
                commercial_id INTEGER PRIMARY KEY,
                air_year      INTEGER NOT NULL,
                start_point   INTEGER NOT NULL,
                end_point     INTEGER NOT NULL,
                file          TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_episodes_show ON episodes (show_id);
            CREATE INDEX IF NOT EXISTS idx_breaks_media ON commercial_breaks (media_id);",
        )
        .map_err(crate::error::Error::Database)?;
        Ok(Self { conn })
    }

    /// Insert a show (used by ingestion tooling and test fixtures)
    pub fn insert_show(&self, show: &Show) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO shows (show_id, title, genres, durations, start_year, end_year,
                                    networks, syndicated, popularity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    show.id,
                    show.title,
                    show.genres.join(","),
                    join_u32(&show.durations),
                    show.start_year,
                    show.end_year,
                    show.networks.join(","),
                    show.syndicated as i64,
                    show.popularity,
                ],
            )
            .map_err(crate::error::Error::Database)?;
        Ok(())
    }

    /// Insert an episode along with its break markers
    pub fn insert_episode(&self, episode: &Episode) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO episodes (episode_id, show_id, air_date, season_number,
                                       episode_number, season, start_point, end_point, file)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    episode.id,
                    episode.show_id,
                    episode.air_date.format(DATE_FORMAT).to_string(),
                    episode.season_number,
                    episode.number,
                    episode.season,
                    episode.start_point,
                    episode.end_point,
                    episode.file,
                ],
            )
            .map_err(crate::error::Error::Database)?;
        for b in &episode.breaks {
            self.conn
                .execute(
                    "INSERT INTO commercial_breaks (media_id, break_point, resume_point)
                     VALUES (?1, ?2, ?3)",
                    params![episode.id, b.break_point, b.resume_point],
                )
                .map_err(crate::error::Error::Database)?;
        }
        Ok(())
    }

    /// Insert a movie
    pub fn insert_movie(&self, movie: &Movie) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO movies (movie_id, title, genres, release_year, season, rating,
                                     start_point, end_point, file)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    movie.id,
                    movie.title,
                    movie.genres.join(","),
                    movie.release_year,
                    movie.season,
                    movie.rating,
                    movie.start_point,
                    movie.end_point,
                    movie.file,
                ],
            )
            .map_err(crate::error::Error::Database)?;
        Ok(())
    }

    /// Insert a special
    pub fn insert_special(&self, special: &Special) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO specials (special_id, title, genres, air_year, season,
                                       start_point, end_point, file)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    special.id,
                    special.title,
                    special.genres.join(","),
                    special.air_year,
                    special.season,
                    special.start_point,
                    special.end_point,
                    special.file,
                ],
            )
            .map_err(crate::error::Error::Database)?;
        Ok(())
    }

    /// Insert a commercial
    pub fn insert_commercial(&self, commercial: &Commercial) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO commercials (commercial_id, air_year, start_point, end_point, file)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    commercial.id,
                    commercial.air_year,
                    commercial.start_point,
                    commercial.end_point,
                    commercial.file,
                ],
            )
            .map_err(crate::error::Error::Database)?;
        Ok(())
    }

    fn row_to_show(row: &rusqlite::Row<'_>) -> rusqlite::Result<Show> {
        Ok(Show {
            id: row.get("show_id")?,
            title: row.get("title")?,
            genres: split_list(&row.get::<_, String>("genres")?),
            durations: split_u32(&row.get::<_, String>("durations")?),
            start_year: row.get("start_year")?,
            end_year: row.get("end_year")?,
            networks: split_list(&row.get::<_, String>("networks")?),
            syndicated: row.get::<_, i64>("syndicated")? != 0,
            popularity: row.get("popularity")?,
        })
    }

    fn row_to_movie(row: &rusqlite::Row<'_>) -> rusqlite::Result<Movie> {
        Ok(Movie {
            id: row.get("movie_id")?,
            title: row.get("title")?,
            genres: split_list(&row.get::<_, String>("genres")?),
            release_year: row.get("release_year")?,
            season: row.get("season")?,
            rating: row.get("rating")?,
            start_point: row.get("start_point")?,
            end_point: row.get("end_point")?,
            file: row.get("file")?,
        })
    }

    fn row_to_special(row: &rusqlite::Row<'_>) -> rusqlite::Result<Special> {
        Ok(Special {
            id: row.get("special_id")?,
            title: row.get("title")?,
            genres: split_list(&row.get::<_, String>("genres")?),
            air_year: row.get("air_year")?,
            season: row.get("season")?,
            start_point: row.get("start_point")?,
            end_point: row.get("end_point")?,
            file: row.get("file")?,
        })
    }

    fn breaks_for(&self, episode: MediaId) -> Result<Vec<BreakMarker>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT break_point, resume_point FROM commercial_breaks
                 WHERE media_id = ?1 ORDER BY break_point",
            )
            .map_err(crate::error::Error::Database)?;
        let breaks = stmt
            .query_map(params![episode], |row| {
                Ok(BreakMarker::new(row.get(0)?, row.get(1)?))
            })
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(breaks)
    }

    fn episodes_where(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Episode>> {
        let sql = format!(
            "SELECT episode_id, show_id, air_date, season_number, episode_number, season,
                    start_point, end_point, file
             FROM episodes WHERE {clause}
             ORDER BY show_id, season_number, episode_number"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(crate::error::Error::Database)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok((
                    row.get::<_, MediaId>("episode_id")?,
                    row.get::<_, ShowId>("show_id")?,
                    row.get::<_, String>("air_date")?,
                    row.get::<_, i32>("season_number")?,
                    row.get::<_, i32>("episode_number")?,
                    row.get::<_, String>("season")?,
                    row.get::<_, u32>("start_point")?,
                    row.get::<_, u32>("end_point")?,
                    row.get::<_, String>("file")?,
                ))
            })
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;

        let mut episodes = Vec::with_capacity(rows.len());
        for (id, show_id, air_date, season_number, number, season, start, end, file) in rows {
            let air_date = NaiveDate::parse_from_str(&air_date, DATE_FORMAT)
                .map_err(|e| crate::error::Error::config(format!("bad air_date: {e}")))?;
            episodes.push(Episode {
                id,
                show_id,
                air_date,
                season_number,
                number,
                season,
                start_point: start,
                end_point: end,
                breaks: self.breaks_for(id)?,
                file,
            });
        }
        Ok(episodes)
    }
}

impl CatalogReader for SqliteCatalog {
    fn show(&self, id: ShowId) -> Result<Option<Show>> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row(
                "SELECT * FROM shows WHERE show_id = ?1",
                params![id],
                Self::row_to_show,
            )
            .optional()
            .map_err(crate::error::Error::Database)
    }

    fn shows_airable_in_year(&self, year: i32) -> Result<Vec<Show>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT * FROM shows
                 WHERE (start_year <= ?1 AND end_year >= ?1)
                    OR (syndicated != 0 AND end_year <= ?1)
                 ORDER BY show_id",
            )
            .map_err(crate::error::Error::Database)?;
        let shows = stmt
            .query_map(params![year], Self::row_to_show)
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(shows)
    }

    fn episodes(&self, show: ShowId) -> Result<Vec<Episode>> {
        self.episodes_where("show_id = ?1", &[&show])
    }

    fn movies(&self, ratings: &[String]) -> Result<Vec<Movie>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM movies ORDER BY movie_id")
            .map_err(crate::error::Error::Database)?;
        let movies = stmt
            .query_map([], Self::row_to_movie)
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(movies
            .into_iter()
            .filter(|m| ratings.is_empty() || ratings.iter().any(|r| r.eq_ignore_ascii_case(&m.rating)))
            .collect())
    }

    fn specials(&self) -> Result<Vec<Special>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM specials ORDER BY special_id")
            .map_err(crate::error::Error::Database)?;
        let specials = stmt
            .query_map([], Self::row_to_special)
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(specials)
    }

    fn commercials(
        &self,
        max_secs: u32,
        from_year: i32,
        to_year: i32,
    ) -> Result<Vec<Commercial>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT commercial_id, air_year, start_point, end_point, file FROM commercials
                 WHERE (end_point - start_point) <= ?1
                   AND air_year >= ?2 AND air_year <= ?3
                 ORDER BY commercial_id",
            )
            .map_err(crate::error::Error::Database)?;
        let commercials = stmt
            .query_map(params![max_secs, from_year, to_year], |row| {
                Ok(Commercial {
                    id: row.get(0)?,
                    air_year: row.get(1)?,
                    start_point: row.get(2)?,
                    end_point: row.get(3)?,
                    file: row.get(4)?,
                })
            })
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(commercials)
    }

    fn seasonal_episodes(&self, season: &str) -> Result<Vec<(Show, Episode)>> {
        let episodes = self.episodes_where("season = ?1", &[&season])?;
        let mut out = Vec::with_capacity(episodes.len());
        for ep in episodes {
            if let Some(show) = self.show(ep.show_id)? {
                out.push((show, ep));
            }
        }
        Ok(out)
    }

    fn seasonal_movies(&self, season: &str) -> Result<Vec<Movie>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM movies WHERE season = ?1 ORDER BY movie_id")
            .map_err(crate::error::Error::Database)?;
        let movies = stmt
            .query_map(params![season], Self::row_to_movie)
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(movies)
    }

    fn seasonal_specials(&self, season: &str) -> Result<Vec<Special>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM specials WHERE season = ?1 ORDER BY special_id")
            .map_err(crate::error::Error::Database)?;
        let specials = stmt
            .query_map(params![season], Self::row_to_special)
            .map_err(crate::error::Error::Database)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(crate::error::Error::Database)?;
        Ok(specials)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn split_u32(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

fn join_u32(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// Memory Catalog
// ============================================================================

/// In-memory catalog for tests and examples
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    shows: Vec<Show>,
    episodes: Vec<Episode>,
    movies: Vec<Movie>,
    specials: Vec<Special>,
    commercials: Vec<Commercial>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_show(&mut self, show: Show) -> &mut Self {
        self.shows.push(show);
        self
    }

    pub fn add_episode(&mut self, episode: Episode) -> &mut Self {
        self.episodes.push(episode);
        self
    }

    pub fn add_movie(&mut self, movie: Movie) -> &mut Self {
        self.movies.push(movie);
        self
    }

    pub fn add_special(&mut self, special: Special) -> &mut Self {
        self.specials.push(special);
        self
    }

    pub fn add_commercial(&mut self, commercial: Commercial) -> &mut Self {
        self.commercials.push(commercial);
        self
    }
}

impl CatalogReader for MemoryCatalog {
    fn show(&self, id: ShowId) -> Result<Option<Show>> {
        Ok(self.shows.iter().find(|s| s.id == id).cloned())
    }

    fn shows_airable_in_year(&self, year: i32) -> Result<Vec<Show>> {
        Ok(self
            .shows
            .iter()
            .filter(|s| s.airable_in(year))
            .cloned()
            .collect())
    }

    fn episodes(&self, show: ShowId) -> Result<Vec<Episode>> {
        let mut eps: Vec<Episode> = self
            .episodes
            .iter()
            .filter(|e| e.show_id == show)
            .cloned()
            .collect();
        eps.sort_by_key(|e| (e.season_number, e.number));
        Ok(eps)
    }

    fn movies(&self, ratings: &[String]) -> Result<Vec<Movie>> {
        Ok(self
            .movies
            .iter()
            .filter(|m| ratings.is_empty() || ratings.iter().any(|r| r.eq_ignore_ascii_case(&m.rating)))
            .cloned()
            .collect())
    }

    fn specials(&self) -> Result<Vec<Special>> {
        Ok(self.specials.clone())
    }

    fn commercials(
        &self,
        max_secs: u32,
        from_year: i32,
        to_year: i32,
    ) -> Result<Vec<Commercial>> {
        Ok(self
            .commercials
            .iter()
            .filter(|c| {
                c.duration() <= max_secs && c.air_year >= from_year && c.air_year <= to_year
            })
            .cloned()
            .collect())
    }

    fn seasonal_episodes(&self, season: &str) -> Result<Vec<(Show, Episode)>> {
        let mut out = Vec::new();
        for ep in self.episodes.iter().filter(|e| e.season == season) {
            if let Some(show) = self.shows.iter().find(|s| s.id == ep.show_id) {
                out.push((show.clone(), ep.clone()));
            }
        }
        Ok(out)
    }

    fn seasonal_movies(&self, season: &str) -> Result<Vec<Movie>> {
        Ok(self
            .movies
            .iter()
            .filter(|m| m.season == season)
            .cloned()
            .collect())
    }

    fn seasonal_specials(&self, season: &str) -> Result<Vec<Special>> {
        Ok(self
            .specials
            .iter()
            .filter(|s| s.season == season)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
