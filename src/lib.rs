//! # Instant-prefetch — préchargement sur intention
//!
//! Précharge la page visée par un lien dès que l'utilisateur montre
//! l'intention de le suivre (doigt posé, survol prolongé, bouton enfoncé),
//! pour masquer une partie de la latence de navigation. Le chargement
//! lui-même reste à la charge de l'hôte : ce crate ne fait que pointer un
//! `<link rel="prefetch">` sur la bonne URL, ou l'en retirer.
//!
//! ## Architecture des modules
//!
//! - [`intent`] : Détecteur d'intention — gestes, minuterie de survol,
//!   cycle de vie attach/detach. Le cœur du crate.
//!
//! - [`eligibility`] : Filtre pur qui décide si un lien peut être préchargé
//!   (origine, schéma, query string, ancre, `data-instant` / `data-no-instant`).
//!
//! - [`document`] : Abstraction du DOM de l'hôte (`closest('a')`, location)
//!   et arbre en mémoire [`document::StaticDocument`].
//!
//! - [`hint`] : Le nœud `<link rel="prefetch">` partagé.
//!
//! - [`input`] : Conversion des événements pointeur Winit (curseur, clics,
//!   touch) en événements d'intention via un hit test de l'hôte.
//!
//! - [`config`] : Configuration TOML et fusion des surcharges.
//!
//! - [`trace`] : Rejeu de traces de gestes scriptées (utilisé par le binaire).

pub mod config;
pub mod document;
pub mod eligibility;
pub mod hint;
pub mod input;
pub mod intent;
pub mod trace;
