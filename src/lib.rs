/*!
# Vizboard

A browser-based data-visualization dashboard, built in Rust.

## Overview

Vizboard lets a user upload a spreadsheet file (Excel or CSV), preview its
rows, and render configurable charts from the parsed data. Datasets, the
current selection, and user accounts live in server-side state backed by
small JSON blobs on disk.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- **Technologies**: a single static HTML page served by the backend
- **Key Components**:
  - Upload form - File selection and dataset naming
  - Dataset list - Selection, preview, and removal
  - Chart form - Kind, axis, and title selection

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Loader - Parses uploaded CSV/XLS/XLSX files into row records
  - Dataset Registry - Maintains the dataset collection and current selection
  - Chart Engine - Derives series from a dataset and renders PNG charts
  - Account Handling - Registration, login, and cookie sessions
  - Error Handler - Surfaces every failure as one human-readable message

### Data Persistence Layer
- One JSON blob holding the whole dataset array, rewritten on each mutation
- One JSON blob of registered users
- Gzip-compressed JSON archives for dataset download/re-import

## Key Features

- Spreadsheet upload (`.xlsx`, `.xls`, `.csv`) with row preview
- Six chart kinds: bar, line, pie, doughnut, scatter, area
- Numeric-column inference for value-axis suggestions
- Dataset export (CSV, XLSX) and archive round-trips
- User authentication and session management

## Modules

- **dataset**: Dataset and cell-value model, numeric-column inference
- **loader**: Upload parsing (CSV hand parser, calamine Excel reader)
- **store**: Dataset blob persistence and gzip archives
- **registry**: Dataset collection, current selection, dashboard summary
- **chart**: Chart configuration, series derivation, plotters rendering
- **downloader**: CSV/XLSX export and chart filenames
- **auth**: User accounts and sessions
- **app**: Routing and handlers

## REST API Endpoints

- `POST /api/upload` - Parses a spreadsheet into a new dataset
- `GET /api/datasets` / `GET /api/datasets/{id}` - Listing and preview
- `POST /api/datasets/{id}/select` / `.../remove` - Selection management
- `POST /api/chart` - Renders the configured chart as PNG
- `GET /api/datasets/{id}/export` - CSV/XLSX download
- `GET /api/datasets/{id}/archive` / `POST /api/import` - Archive round-trip
- `GET /api/stats` - Dashboard summary
- `POST /api/signup`, `/api/login`, `/api/logout`, `GET /api/me` - Accounts
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod auth;
pub mod chart;
pub mod dataset;
pub mod downloader;
pub mod loader;
pub mod registry;
pub mod store;

/// Re-export everything from these modules to make it easier to use
pub use chart::*;
pub use dataset::*;
pub use downloader::*;
pub use loader::*;
pub use registry::*;
pub use store::*;
