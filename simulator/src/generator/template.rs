use civiccore::feed_interface::Feed;

/// Static vocabulary used to synthesize records for one feed.
pub struct FeedTemplate {
    pub prefix: &'static str,
    pub names: &'static [&'static str],
    pub statuses: &'static [&'static str],
    /// Relative weight of each status, same length as `statuses`.
    pub weights: &'static [u32],
    pub extra_field: Option<(&'static str, &'static [&'static str])>,
    pub positioned: bool,
}

/// Approximate center of the city, used as the base for generated positions.
pub const CITY_CENTER: (f64, f64) = (-22.9068, -43.1729);

const NEIGHBORHOODS: &[&str] = &[
    "Rocinha",
    "Tijuca",
    "Copacabana",
    "Madureira",
    "Campo Grande",
    "Botafogo",
    "Jacarepaguá",
    "Penha",
];

pub fn template_for(feed: Feed) -> FeedTemplate {
    match feed {
        Feed::Alerts => FeedTemplate {
            prefix: "al",
            names: &["Chuva forte", "Deslizamento", "Calor extremo", "Ressaca", "Evento"],
            statuses: &["Estágio 1", "Estágio 2", "Estágio 3", "Estágio 4", "Estágio 5"],
            weights: &[6, 4, 2, 1, 1],
            extra_field: Some(("region", NEIGHBORHOODS)),
            positioned: false,
        },
        Feed::WeatherStations => FeedTemplate {
            prefix: "ws",
            names: &["Estação", "Pluviômetro"],
            statuses: &["sem chuva", "chuva fraca", "chuva moderada", "chuva forte", "chuva muito forte"],
            weights: &[8, 4, 2, 1, 1],
            extra_field: Some(("neighborhood", NEIGHBORHOODS)),
            positioned: true,
        },
        Feed::Traffic => FeedTemplate {
            prefix: "tr",
            names: &["Av. Brasil", "Linha Amarela", "Túnel Rebouças", "Aterro do Flamengo", "Ponte Rio-Niterói"],
            statuses: &["liberada", "parcialmente interditada", "interditada"],
            weights: &[6, 3, 1],
            extra_field: Some(("reason", &["obra", "acidente", "evento", "alagamento"])),
            positioned: true,
        },
        Feed::Sirens => FeedTemplate {
            prefix: "s",
            names: &["Sirene"],
            statuses: &["ativa", "acionada", "desativada"],
            weights: &[10, 1, 1],
            extra_field: Some(("community", NEIGHBORHOODS)),
            positioned: true,
        },
        Feed::TouristPoints => FeedTemplate {
            prefix: "tp",
            names: &["Cristo Redentor", "Pão de Açúcar", "Maracanã", "Jardim Botânico", "Escadaria Selarón"],
            statuses: &["aberto", "lotado", "fechado"],
            weights: &[7, 2, 1],
            extra_field: None,
            positioned: true,
        },
        Feed::Beaches => FeedTemplate {
            prefix: "bc",
            names: &["Copacabana", "Ipanema", "Leblon", "Leme", "Barra", "Recreio"],
            statuses: &["própria", "imprópria"],
            weights: &[3, 1],
            extra_field: None,
            positioned: true,
        },
    }
}
